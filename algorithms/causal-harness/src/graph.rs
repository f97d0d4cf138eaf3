use crate::admg::ADMG;
use crate::data::{AGE, BLOOD_PRESSURE, DRUG_DOSAGE, EXERCISE_HOURS, SODIUM_INTAKE};

pub type CausalGraph = ADMG<&'static str>;

/// Assumed causal dependencies between the synthesized variables.
pub const EDGES: [(&str, &str); 6] = [
    (AGE, DRUG_DOSAGE),
    (AGE, EXERCISE_HOURS),
    (AGE, BLOOD_PRESSURE),
    (DRUG_DOSAGE, BLOOD_PRESSURE),
    (EXERCISE_HOURS, BLOOD_PRESSURE),
    (SODIUM_INTAKE, BLOOD_PRESSURE),
];

pub fn blood_pressure_graph() -> CausalGraph {
    let mut g = CausalGraph::new();
    let age = g.add_node(AGE);
    let drug = g.add_node(DRUG_DOSAGE);
    let exercise = g.add_node(EXERCISE_HOURS);
    let sodium = g.add_node(SODIUM_INTAKE);
    let pressure = g.add_node(BLOOD_PRESSURE);

    g.add_edge(age, drug, ());
    g.add_edge(age, exercise, ());
    g.add_edge(age, pressure, ());
    g.add_edge(drug, pressure, ());
    g.add_edge(exercise, pressure, ());
    g.add_edge(sodium, pressure, ());
    g
}
