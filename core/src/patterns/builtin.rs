//! Builtin pattern catalogs
//!
//! Templates use two placeholders expanded at compile time:
//! - `{target}`: an optional article followed by the creature (entity link or
//!   plain name), captured as `target`
//! - `{amount}`: a decimal amount, captured as `amount`
//!
//! Within each catalog, specific templates come before generic ones.

use super::definition::{BodyPart, Outcome, PatternDefinition, StatusAction};

/// Every builtin definition, grouped by catalog.
pub fn builtin_definitions() -> Vec<PatternDefinition> {
    let mut defs = Vec::new();
    defs.extend(flare_catalog());
    defs.extend(critical_catalog());
    defs.extend(damage_catalog());
    defs.extend(status_catalog());
    defs.extend(sequence_catalog());
    defs
}

// ═══════════════════════════════════════════════════════════════════════════
// Flares
// ═══════════════════════════════════════════════════════════════════════════

fn flare_catalog() -> Vec<PatternDefinition> {
    vec![
        // Area flares first: their wording overlaps the single-target ones
        PatternDefinition::flare(
            "firestorm",
            Outcome::Damage,
            true,
            &[r"^\*\* a (?:massive )?(?:gout|storm) of flame erupts from your .+?!"],
        ),
        PatternDefinition::flare(
            "thunderclap",
            Outcome::Damage,
            true,
            &[r"^\*\* your .+? releases a deafening thunderclap that rolls across the area"],
        ),
        PatternDefinition::flare(
            "fire",
            Outcome::Damage,
            false,
            &[r"^\*\* your .+? flares with a burst of flame"],
        ),
        PatternDefinition::flare(
            "ice",
            Outcome::Damage,
            false,
            &[
                r"^\*\* your .+? glows intensely with a cold blue light",
                r"^\*\* your .+? releases a blast of icy air",
            ],
        ),
        PatternDefinition::flare(
            "lightning",
            Outcome::Damage,
            false,
            &[r"^\*\* your .+? (?:emits|releases) a searing bolt of lightning"],
        ),
        PatternDefinition::flare(
            "acid",
            Outcome::Damage,
            false,
            &[r"^\*\* your .+? releases a spray of acid"],
        ),
        PatternDefinition::flare(
            "disruption",
            Outcome::Damage,
            false,
            &[r"^\*\* your .+? unleashes a blast of disruptive force"],
        ),
        PatternDefinition::flare(
            "dispel",
            Outcome::Dispel,
            false,
            &[r"^\*\* your .+? pulses with a dampening energy"],
        ),
        PatternDefinition::flare(
            "blink",
            Outcome::Blink,
            false,
            &[
                r"^\*\* your .+? (?:winks|blinks) out of existence",
                r"^your .+? blinks with a hazy light as it materializes",
            ],
        ),
        PatternDefinition::flare(
            "mana leech",
            Outcome::Buff,
            false,
            &[r"^\*\* your .+? glows as it draws (?:mana|essence) from"],
        ),
        PatternDefinition::flare(
            "enfeeble",
            Outcome::Debuff,
            false,
            &[r"^\*\* your .+? releases a wave of enfeebling energy"],
        ),
        PatternDefinition::flare(
            "soothing",
            Outcome::Heal,
            false,
            &[r"^\*\* your .+? (?:pulses|glows) with a soothing warmth"],
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Criticals (wounds)
// ═══════════════════════════════════════════════════════════════════════════

fn critical_catalog() -> Vec<PatternDefinition> {
    use BodyPart::*;

    vec![
        // ─── Fatal ──────────────────────────────────────────────────────────
        PatternDefinition::critical(
            "decapitation",
            Neck,
            6,
            true,
            &[
                r"^{target}'s head (?:flies|tumbles) (?:off|from)",
                r"neck is severed",
            ],
        ),
        PatternDefinition::critical(
            "skull shattered",
            Head,
            6,
            true,
            &[r"^skull shattered!", r"^{target}'s skull shatters"],
        ),
        PatternDefinition::critical(
            "heart pierced",
            Chest,
            6,
            true,
            &[r"(?:pierces|through) the heart"],
        ),
        PatternDefinition::critical(
            "disemboweled",
            Abdomen,
            6,
            true,
            &[r"disembowel"],
        ),
        PatternDefinition::critical(
            "nerves fried",
            Nerves,
            6,
            true,
            &[r"nervous system (?:is fried|shuts down)"],
        ),
        // ─── Head and neck ──────────────────────────────────────────────────
        PatternDefinition::critical(
            "cracked skull",
            Head,
            3,
            false,
            &[r"skull (?:cracks|is cracked)"],
        ),
        PatternDefinition::critical("head strike", Head, 1, false, &[r"^(?:strike|blow) to the head"]),
        PatternDefinition::critical(
            "neck gash",
            Neck,
            2,
            false,
            &[r"^(?:deep )?gash across the neck"],
        ),
        // ─── Torso ──────────────────────────────────────────────────────────
        PatternDefinition::critical(
            "chest blow",
            Chest,
            1,
            false,
            &[r"^(?:hard )?blow to the chest"],
        ),
        PatternDefinition::critical(
            "belly gash",
            Abdomen,
            2,
            false,
            &[r"^(?:deep )?gash across the abdomen"],
        ),
        PatternDefinition::critical("back strike", Back, 2, false, &[r"^(?:strike|blow) to the back"]),
        // ─── Limbs ──────────────────────────────────────────────────────────
        PatternDefinition::critical(
            "right leg shattered",
            RightLeg,
            3,
            false,
            &[r"right leg (?:shatters|is shattered)"],
        ),
        PatternDefinition::critical(
            "left leg shattered",
            LeftLeg,
            3,
            false,
            &[r"left leg (?:shatters|is shattered)"],
        ),
        PatternDefinition::critical(
            "right arm gash",
            RightArm,
            2,
            false,
            &[r"^(?:deep )?(?:cut|gash) (?:to|across) the right arm"],
        ),
        PatternDefinition::critical(
            "left arm gash",
            LeftArm,
            2,
            false,
            &[r"^(?:deep )?(?:cut|gash) (?:to|across) the left arm"],
        ),
        PatternDefinition::critical(
            "right hand strike",
            RightHand,
            1,
            false,
            &[r"^(?:strike|blow) to the right hand"],
        ),
        PatternDefinition::critical(
            "left hand strike",
            LeftHand,
            1,
            false,
            &[r"^(?:strike|blow) to the left hand"],
        ),
        // ─── Eyes and nerves ────────────────────────────────────────────────
        PatternDefinition::critical(
            "right eye gouged",
            RightEye,
            4,
            false,
            &[r"right eye (?:is gouged out|explodes)"],
        ),
        PatternDefinition::critical(
            "left eye gouged",
            LeftEye,
            4,
            false,
            &[r"left eye (?:is gouged out|explodes)"],
        ),
        PatternDefinition::critical(
            "nerve jolt",
            Nerves,
            3,
            false,
            &[r"^(?:jolt|shock) to the nervous system"],
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Damage and death
// ═══════════════════════════════════════════════════════════════════════════

fn damage_catalog() -> Vec<PatternDefinition> {
    vec![
        PatternDefinition::damage(
            "hit",
            &[
                r"^{target} (?:is|are) (?:hit|struck) for {amount} points? of damage",
                r"\.\.\. and hits? for {amount} points? of damage",
                r"{amount} points? of damage",
            ],
        ),
        PatternDefinition::death(
            "death",
            &[
                r"^{target} (?:falls|collapses|crumples) (?:to the ground|into a heap) (?:motionless|and dies|and lies still)",
                r"^{target} lets out a (?:final|last) [\w ]+? and (?:dies|goes still)",
                r"^{target} dies[.!]",
            ],
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Statuses
// ═══════════════════════════════════════════════════════════════════════════

fn status_catalog() -> Vec<PatternDefinition> {
    use StatusAction::{Add, Remove};

    let pronoun = "(?:its|his|her|their)";
    let def = |name: &str, action: StatusAction, templates: &[&str]| {
        let expanded: Vec<String> = templates.iter().map(|t| t.replace("{pronoun}", pronoun)).collect();
        let refs: Vec<&str> = expanded.iter().map(String::as_str).collect();
        PatternDefinition::status(name, action, &refs)
    };

    vec![
        def("stunned", Add, &[r"^{target} (?:is|appears) stunned"]),
        def(
            "stunned",
            Remove,
            &[
                r"^{target} (?:regains|recovers) {pronoun} composure",
                r"^{target} shakes off the stun",
            ],
        ),
        def(
            "prone",
            Add,
            &[r"^{target} (?:is knocked to the ground|falls to the ground|is knocked down)!"],
        ),
        def(
            "prone",
            Remove,
            &[r"^{target} (?:stands back up|rises to {pronoun} feet|struggles back to {pronoun} feet)"],
        ),
        def(
            "webbed",
            Add,
            &[r"^{target} (?:is|becomes) (?:stuck|entangled) in (?:a mass of )?sticky webbing"],
        ),
        def("webbed", Remove, &[r"^{target} (?:breaks|struggles) free of the webbing"]),
        def("sleeping", Add, &[r"^{target} (?:falls|drifts) (?:fast )?asleep"]),
        def("sleeping", Remove, &[r"^{target} (?:wakes up|awakens)"]),
        def(
            "calmed",
            Add,
            &[r"^{target} (?:seems|looks|appears) (?:calmed|calm and peaceful)"],
        ),
        def("calmed", Remove, &[r"^{target} (?:looks|seems) agitated again"]),
        def(
            "immobilized",
            Add,
            &[r"^{target} (?:is|becomes) (?:frozen in place|held fast)"],
        ),
        def(
            "immobilized",
            Remove,
            &[r"^{target} (?:can move again|is no longer held)"],
        ),
        def(
            "frozen",
            Add,
            &[r"^{target} (?:is frozen solid|is encased in (?:a block of )?ice)"],
        ),
        def(
            "frozen",
            Remove,
            &[r"^{target} (?:thaws out|breaks free of the ice)"],
        ),
        def("blinded", Add, &[r"^{target} (?:is|appears) blinded"]),
        def(
            "blinded",
            Remove,
            &[r"^{target} (?:can see again|blinks and regains {pronoun} sight)"],
        ),
        def("silenced", Add, &[r"^{target} (?:is|appears) silenced"]),
        def(
            "silenced",
            Remove,
            &[r"^{target} (?:finds|regains) {pronoun} voice"],
        ),
        def("poisoned", Add, &[r"^{target} (?:is|looks) (?:poisoned|sickly green)"]),
        def("poisoned", Remove, &[r"^{target} (?:looks|appears) less (?:green|sickly)"]),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Attack sequences
// ═══════════════════════════════════════════════════════════════════════════

fn sequence_catalog() -> Vec<PatternDefinition> {
    vec![
        PatternDefinition::sequence(
            "attack",
            Outcome::Engage,
            &[
                r"^you (?:swing|thrust|slash|chop|punch|kick|jab|fire|hurl|throw|attack)(?: .+?)? at {target}!",
                r"^you (?:channel|gesture|cast)(?: .+?)? at {target}[.!]",
            ],
        ),
        PatternDefinition::sequence(
            "incoming",
            Outcome::Disengage,
            &[
                r"^{target} (?:swings|thrusts|slashes|claws|bites|lunges|charges|pounces|gestures|attacks)(?: .+?)? at you[.!]",
            ],
        ),
    ]
}
