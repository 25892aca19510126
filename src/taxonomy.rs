//! Static domain taxonomy
//!
//! The ordered list of fields and their dated topics that the static graph baseline is
//! built from. A bundled physics taxonomy is always available; alternative taxonomies
//! can be read from YAML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Id of the field that auto-promoted concept topics are filed under
pub const PROMOTION_FIELD: &str = "mathematical-physics";

fn default_true() -> bool {
    true
}

fn default_root_label() -> String {
    "PHYSICS".to_string()
}

/// A top-level field of study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the field gets an angular sector in the network layout
    #[serde(default = "default_true")]
    pub sector: bool,
}

/// A dated topic belonging to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub id: String,
    pub field_id: String,

    /// Raw time attribute as authored (usually a year)
    pub year: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A keyword section of a topic page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub id: String,
    pub topic_id: String,
    pub title: String,
}

/// Fields, topics and sections known at build time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default = "default_root_label")]
    pub root_label: String,

    pub fields: Vec<Field>,

    #[serde(default)]
    pub topics: Vec<TopicEntry>,

    #[serde(default)]
    pub sections: Vec<SectionEntry>,
}

/// Parse an authored time attribute into a comparable scalar.
///
/// `"0"` is the marker stored for auto-promoted topics and counts as unknown.
pub fn parse_time_value(raw: &str) -> Option<i32> {
    match raw.trim().parse::<i32>() {
        Ok(0) => None,
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(value = raw, "time value is not a year, treating as unknown");
            None
        }
    }
}

impl Taxonomy {
    /// Read a taxonomy from a YAML file
    pub fn from_yaml_path(path: &Path) -> GraphResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GraphError::Taxonomy(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> GraphResult<Self> {
        serde_yaml::from_str(content).map_err(|e| GraphError::Taxonomy(e.to_string()))
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Field ids in declared order
    pub fn field_order(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.id.clone()).collect()
    }

    /// Field ids that own an angular sector, in declared order
    pub fn sector_groups(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.sector)
            .map(|f| f.id.clone())
            .collect()
    }

    /// The bundled physics taxonomy
    pub fn physics() -> Self {
        let field = |id: &str, name: &str, description: &str| Field {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            sector: true,
        };
        let topic =
            |id: &str, field_id: &str, year: &str, title: &str, slug: &str, summary: &str| {
                TopicEntry {
                    id: id.to_string(),
                    field_id: field_id.to_string(),
                    year: year.to_string(),
                    title: title.to_string(),
                    slug: Some(slug.to_string()),
                    summary: Some(summary.to_string()),
                }
            };
        let section = |id: &str, topic_id: &str, title: &str| SectionEntry {
            id: id.to_string(),
            topic_id: topic_id.to_string(),
            title: title.to_string(),
        };

        Self {
            root_label: default_root_label(),
            fields: vec![
                field(
                    "classical",
                    "Classical Mechanics",
                    "The study of the motion of bodies under the action of forces.",
                ),
                field(
                    "electrodynamics",
                    "Electrodynamics",
                    "The branch of physics which deals with rapidly changing electric and magnetic fields.",
                ),
                field(
                    "statistical",
                    "Statistical Mechanics",
                    "Probability theory applied to the average behavior of mechanical systems.",
                ),
                field(
                    "quantum",
                    "Quantum Mechanics",
                    "The physical properties of nature at the scale of atoms and subatomic particles.",
                ),
                field(
                    PROMOTION_FIELD,
                    "Mathematical Physics",
                    "Mathematical methods and concepts shared across physics.",
                ),
            ],
            topics: vec![
                topic(
                    "c1",
                    "classical",
                    "1687",
                    "Newton's Laws of Motion",
                    "newtons-laws",
                    "The foundation of classical mechanics describing the relationship between a body and the forces acting upon it.",
                ),
                topic(
                    "c2",
                    "classical",
                    "1788",
                    "Lagrangian Mechanics",
                    "lagrangian-mechanics",
                    "A reformulation of classical mechanics that combines conservation of momentum and energy.",
                ),
                topic(
                    "c3",
                    "classical",
                    "1833",
                    "Hamiltonian Mechanics",
                    "hamiltonian-mechanics",
                    "A theory that evolved from Lagrangian mechanics, providing a powerful framework for quantum mechanics.",
                ),
                topic(
                    "c4",
                    "classical",
                    "1609",
                    "Kepler's Laws",
                    "keplers-laws",
                    "Three scientific laws describing the motion of planets around the Sun.",
                ),
                topic(
                    "c5",
                    "classical",
                    "1638",
                    "Galilean Relativity",
                    "galilean-relativity",
                    "The principle that the laws of motion are the same in all inertial frames.",
                ),
                topic(
                    "c6",
                    "classical",
                    "1905",
                    "Special Relativity",
                    "special-relativity",
                    "Einstein's theory reconciling mechanics with electromagnetism.",
                ),
                topic(
                    "q1",
                    "quantum",
                    "1900",
                    "Planck's Quantization",
                    "planck-quantization",
                    "The discovery that energy is exchanged in discrete packets called quanta.",
                ),
                topic(
                    "q2",
                    "quantum",
                    "1924",
                    "Wave-Particle Duality",
                    "wave-particle-duality",
                    "The concept that every particle or quantum entity may be described as either a particle or a wave.",
                ),
                topic(
                    "q3",
                    "quantum",
                    "1926",
                    "Schrödinger Equation",
                    "schrodinger-equation",
                    "A linear partial differential equation that governs the wave function of a quantum-mechanical system.",
                ),
                topic(
                    "q4",
                    "quantum",
                    "1927",
                    "Heisenberg Uncertainty",
                    "heisenberg-uncertainty",
                    "A fundamental limit to the precision with which certain pairs of physical properties can be known.",
                ),
                topic(
                    "q5",
                    "quantum",
                    "1964",
                    "Bell's Theorem",
                    "bells-theorem",
                    "A theorem that demonstrates that quantum mechanics is incompatible with local hidden-variable theories.",
                ),
                topic(
                    "q6",
                    "quantum",
                    "1981",
                    "Quantum Computing Ideas",
                    "quantum-computing",
                    "Feynman proposes using quantum systems to simulate physics.",
                ),
                topic(
                    "s1",
                    "statistical",
                    "1860",
                    "Maxwell-Boltzmann Dist.",
                    "maxwell-boltzmann",
                    "Describes particle speeds in idealized gases.",
                ),
                topic(
                    "s2",
                    "statistical",
                    "1872",
                    "Boltzmann Entropy",
                    "boltzmann-entropy",
                    "The statistical definition of entropy and the H-theorem.",
                ),
                topic(
                    "s3",
                    "statistical",
                    "1876",
                    "Gibbs Phase Rule",
                    "gibbs-phase-rule",
                    "A criterion for the number of phases that can coexist in equilibrium.",
                ),
                topic(
                    "s4",
                    "statistical",
                    "1905",
                    "Brownian Motion",
                    "brownian-motion",
                    "The random motion of particles suspended in a medium.",
                ),
                topic(
                    "s5",
                    "statistical",
                    "1920",
                    "Ising Model",
                    "ising-model",
                    "A mathematical model of ferromagnetism in statistical mechanics.",
                ),
                topic(
                    "s6",
                    "statistical",
                    "1940",
                    "Fluctuation Theorem",
                    "fluctuation-theorem",
                    "Relates validity of the Second Law of Thermodynamics to the size of the system.",
                ),
                topic(
                    "e1",
                    "electrodynamics",
                    "1785",
                    "Coulomb's Law",
                    "coulombs-law",
                    "The law describing the electrostatic force of interaction between electrically charged particles.",
                ),
                topic(
                    "e2",
                    "electrodynamics",
                    "1820",
                    "Ampère's Force Law",
                    "amperes-law",
                    "Describes the magnetic force between two current-carrying wires.",
                ),
                topic(
                    "e3",
                    "electrodynamics",
                    "1831",
                    "Faraday's Induction",
                    "faradays-law",
                    "The principle that a changing magnetic field creates an electric field.",
                ),
                topic(
                    "e4",
                    "electrodynamics",
                    "1861",
                    "Maxwell's Equations",
                    "maxwells-equations",
                    "A set of coupled partial differential equations that form the foundation of classical electromagnetism.",
                ),
                topic(
                    "e5",
                    "electrodynamics",
                    "1895",
                    "Lorentz Force",
                    "lorentz-force",
                    "The force exerted on a charged particle moving through electric and magnetic fields.",
                ),
                topic(
                    "e6",
                    "electrodynamics",
                    "1948",
                    "Quantum Electrodynamics",
                    "qed",
                    "The relativistic quantum field theory of electrodynamics (Feynman, Schwinger, Tomonaga).",
                ),
            ],
            sections: vec![
                section("k1", "c1", "First Law (Inertia)"),
                section("k2", "c1", "Second Law (F=ma)"),
                section("k3", "c1", "Third Law (Action-Reaction)"),
                section("k4", "c1", "Historical Context"),
                section("k5", "c1", "Applications"),
                section("k6", "q3", "The Wave Function"),
                section("k7", "q3", "Time-Dependent Equation"),
                section("k8", "q3", "The Hamiltonian"),
                section("k9", "q3", "Interpretation"),
                section("k10", "q3", "Schrödinger's Cat"),
            ],
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::physics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_years() {
        assert_eq!(parse_time_value("1687"), Some(1687));
        assert_eq!(parse_time_value(" 1905 "), Some(1905));
        assert_eq!(parse_time_value("-350"), Some(-350));
    }

    #[test]
    fn unparseable_years_are_unknown() {
        assert_eq!(parse_time_value(""), None);
        assert_eq!(parse_time_value("circa 1900"), None);
        assert_eq!(parse_time_value("0"), None);
    }

    #[test]
    fn physics_taxonomy_has_declared_field_order() {
        let taxonomy = Taxonomy::physics();
        assert_eq!(
            taxonomy.field_order(),
            vec![
                "classical",
                "electrodynamics",
                "statistical",
                "quantum",
                "mathematical-physics"
            ]
        );
        assert_eq!(taxonomy.sector_groups().len(), 5);
    }

    #[test]
    fn physics_topics_reference_known_fields() {
        let taxonomy = Taxonomy::physics();
        for topic in &taxonomy.topics {
            assert!(
                taxonomy.field(&topic.field_id).is_some(),
                "topic {} has unknown field {}",
                topic.id,
                topic.field_id
            );
        }
    }

    #[test]
    fn physics_topics_carry_summaries() {
        let taxonomy = Taxonomy::physics();
        assert!(taxonomy.topics.iter().all(|t| t.summary.is_some()));

        let bell = taxonomy.topics.iter().find(|t| t.id == "q5").unwrap();
        assert_eq!(
            bell.summary.as_deref(),
            Some(
                "A theorem that demonstrates that quantum mechanics is incompatible with local hidden-variable theories."
            )
        );
    }

    #[test]
    fn reads_yaml_with_defaults() {
        let yaml = r#"
fields:
  - id: optics
    name: Optics
  - id: acoustics
    name: Acoustics
    sector: false
topics:
  - id: o1
    field_id: optics
    year: "1621"
    title: Snell's Law
"#;
        let taxonomy = Taxonomy::from_yaml_str(yaml).expect("Should parse taxonomy");

        assert_eq!(taxonomy.root_label, "PHYSICS");
        assert_eq!(taxonomy.fields.len(), 2);
        assert!(taxonomy.fields[0].sector);
        assert!(!taxonomy.fields[1].sector);
        assert_eq!(taxonomy.sector_groups(), vec!["optics"]);
        assert_eq!(taxonomy.topics[0].slug, None);
        assert!(taxonomy.sections.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_taxonomy_error() {
        let result = Taxonomy::from_yaml_str("fields: 42");
        assert!(matches!(result, Err(GraphError::Taxonomy(_))));
    }

    #[test]
    fn missing_file_is_a_taxonomy_error() {
        let result = Taxonomy::from_yaml_path(Path::new("tests/fixtures/does-not-exist.yaml"));
        assert!(matches!(result, Err(GraphError::Taxonomy(_))));
    }
}
