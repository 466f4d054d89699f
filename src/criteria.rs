use serde::{Deserialize, Serialize};

/// One of the six fixed dimensions an instrument/group is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Tuning,
    Articulation,
    Rhythm,
    Cohesion,
    Dynamics,
    Memorization,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Tuning,
        Criterion::Articulation,
        Criterion::Rhythm,
        Criterion::Cohesion,
        Criterion::Dynamics,
        Criterion::Memorization,
    ];

    pub fn definition(self) -> &'static CriterionDefinition {
        &CRITERIA[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Targeted technique recommendation offered when a criterion turns into a quality risk.
#[derive(Debug)]
pub struct RecommendationTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub expected_impact: &'static str,
    pub timeline: &'static str,
}

#[derive(Debug)]
pub struct CriterionDefinition {
    pub criterion: Criterion,
    pub name: &'static str,
    /// Relative weight. Informational only: aggregate scores use an unweighted mean.
    pub weight: f64,
    /// Descriptions for levels 1 through 5.
    pub levels: [&'static str; 5],
    pub tips: &'static [&'static str],
    pub mitigation: &'static str,
    pub template: Option<RecommendationTemplate>,
}

impl CriterionDefinition {
    /// Level text for a score in 1..=5, `None` for "not rated" or out of range.
    pub fn level(&self, score: u8) -> Option<&'static str> {
        match score {
            1..=5 => Some(self.levels[usize::from(score) - 1]),
            _ => None,
        }
    }
}

/// Indexed by `Criterion as usize`.
pub static CRITERIA: [CriterionDefinition; 6] = [
    CriterionDefinition {
        criterion: Criterion::Tuning,
        name: "Tuning",
        weight: 0.2,
        levels: [
            "Pitch is unstable throughout and intervals are rarely in tune",
            "Frequent intonation problems, especially in exposed passages",
            "Generally in tune with lapses in difficult registers",
            "Secure intonation with occasional drift in long notes",
            "Consistently precise intonation across all registers",
        ],
        tips: &[
            "Tune individually against a drone before each rehearsal",
            "Practice slow chord progressions listening for beats",
            "Record sectionals and mark out-of-tune bars",
        ],
        mitigation: "Schedule daily intonation work with a drone and tuner",
        template: Some(RecommendationTemplate {
            title: "Targeted intonation training",
            description: "Open every rehearsal with ten minutes of chord tuning and isolate unstable intervals in sectionals",
            expected_impact: "Noticeably steadier pitch within a few rehearsals",
            timeline: "2-3 weeks",
        }),
    },
    CriterionDefinition {
        criterion: Criterion::Articulation,
        name: "Articulation",
        weight: 0.15,
        levels: [
            "Attacks and releases are unclear and inconsistent",
            "Articulation markings are frequently ignored",
            "Markings are followed but lack uniformity between players",
            "Clean and mostly unified articulation",
            "Crisp, unified articulation that serves the musical style",
        ],
        tips: &[
            "Agree on bowings, breathings and tonguings section by section",
            "Practice difficult passages on a single repeated pitch",
            "Exaggerate contrasts between legato and staccato",
        ],
        mitigation: "Unify articulation markings and rehearse them slowly by section",
        template: Some(RecommendationTemplate {
            title: "Articulation unification drills",
            description: "Mark a single articulation plan in every part and drill key passages on one pitch until attacks align",
            expected_impact: "Cleaner, more homogeneous phrasing",
            timeline: "2 weeks",
        }),
    },
    CriterionDefinition {
        criterion: Criterion::Rhythm,
        name: "Rhythm",
        weight: 0.2,
        levels: [
            "Pulse is lost regularly and entries are missed",
            "Unsteady tempo with rushing or dragging",
            "Mostly steady pulse with issues in complex figures",
            "Solid rhythm with minor imprecision in transitions",
            "Rock-solid pulse and precise subdivisions",
        ],
        tips: &[
            "Practice with a metronome on subdivisions",
            "Clap and count difficult figures before playing them",
            "Rehearse transitions between tempo changes in isolation",
        ],
        mitigation: "Rehearse problem passages with a metronome at reduced tempo",
        template: Some(RecommendationTemplate {
            title: "Rhythmic precision work",
            description: "Run difficult figures with a subdivided metronome, raising the tempo gradually once they are stable",
            expected_impact: "Steadier pulse and tighter ensemble entries",
            timeline: "1-2 weeks",
        }),
    },
    CriterionDefinition {
        criterion: Criterion::Cohesion,
        name: "Cohesion",
        weight: 0.15,
        levels: [
            "Players perform as individuals without listening to each other",
            "Limited awareness of other voices",
            "Sections are coordinated but the ensemble feels fragmented",
            "Good balance and listening with occasional lapses",
            "A single, well-balanced ensemble sound",
        ],
        tips: &[
            "Rotate seating so players hear different voices",
            "Rehearse with the conductor silent to build listening",
            "Work on balance by naming the leading voice in each passage",
        ],
        mitigation: "Add listening exercises and balance work to every rehearsal",
        template: None,
    },
    CriterionDefinition {
        criterion: Criterion::Dynamics,
        name: "Dynamics",
        weight: 0.15,
        levels: [
            "No dynamic contrast",
            "Dynamic markings are seldom observed",
            "Contrasts present but limited in range",
            "Wide dynamic range with good control",
            "Expressive, finely graded dynamics",
        ],
        tips: &[
            "Practice crescendos and diminuendos over a fixed number of beats",
            "Define a shared scale from pianissimo to fortissimo",
            "Record and compare the loudest and softest passages",
        ],
        mitigation: "Define a shared dynamic scale and rehearse contrasts explicitly",
        template: Some(RecommendationTemplate {
            title: "Dynamic range expansion",
            description: "Rehearse marked contrasts at exaggerated levels and agree on a common dynamic scale",
            expected_impact: "More expressive and controlled performances",
            timeline: "2-3 weeks",
        }),
    },
    CriterionDefinition {
        criterion: Criterion::Memorization,
        name: "Memorization",
        weight: 0.15,
        levels: [
            "Fully dependent on the score",
            "Recalls only isolated fragments",
            "Main sections memorized with frequent hesitation",
            "Mostly memorized with minor slips",
            "Fully memorized and confident",
        ],
        tips: &[
            "Memorize in short sections and chain them together",
            "Practice starting from any rehearsal mark",
            "Review the form and harmonic plan away from the instrument",
        ],
        mitigation: "Set weekly memorization goals per section and verify them in rehearsal",
        template: None,
    },
];
