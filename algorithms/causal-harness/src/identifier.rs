use petgraph::algo::toposort;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use tracing::{debug, trace, warn};

use crate::admg::{Variable, ADMG};
use crate::error::{CausalError, Location, Result};
use crate::setutils::{setdiff, setintersect, setunion, OrderedSet};

#[derive(Clone, Debug)]
enum EstimandProbabilities<T> {
    // outcome variables, conditional variables
    Basic(Vec<T>, Vec<T>),
    // product, sum
    Compose(Vec<Estimand<T>>, Vec<T>),
}

/// Probability expression produced by the ID algorithm.
#[derive(Clone, Debug)]
pub struct Estimand<T> {
    value: EstimandProbabilities<T>,
}

impl<T> Estimand<T> {
    pub fn map<U>(&self, f: &impl Fn(&T) -> U) -> Estimand<U> {
        let value = match &self.value {
            EstimandProbabilities::Basic(outcome_vars, conditional_vars) => EstimandProbabilities::Basic(
                outcome_vars.iter().map(f).collect(),
                conditional_vars.iter().map(f).collect(),
            ),
            EstimandProbabilities::Compose(product, sumset) => EstimandProbabilities::Compose(
                product.iter().map(|p| p.map(f)).collect(),
                sumset.iter().map(f).collect(),
            ),
        };
        Estimand { value }
    }
}

fn write_joined<T: Display>(f: &mut fmt::Formatter<'_>, vars: &[T]) -> fmt::Result {
    for (i, var) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", var)?;
    }
    Ok(())
}

impl<T: Display> Display for Estimand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            EstimandProbabilities::Basic(outcome_vars, conditional_vars) => {
                write!(f, "P(")?;
                write_joined(f, outcome_vars)?;
                if !conditional_vars.is_empty() {
                    write!(f, "|")?;
                    write_joined(f, conditional_vars)?;
                }
                write!(f, ")")
            }
            EstimandProbabilities::Compose(product, sumset) => {
                if !sumset.is_empty() {
                    write!(f, "∑{{")?;
                    write_joined(f, sumset)?;
                    write!(f, "}}(")?;
                }
                for prod in product.iter() {
                    write!(f, "{}", prod)?;
                }
                if !sumset.is_empty() {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct IDIdentifier {}

impl IDIdentifier {
    pub fn new() -> Self {
        IDIdentifier {}
    }

    /*
      Implementation of the ID algorithm.
      Link - https://ftp.cs.ucla.edu/pub/stat_ser/shpitser-thesis.pdf
      helpful link for implementation in R: https://arxiv.org/pdf/1806.07161.pdf
      The pseudo code has been provided on Pg 40.
    */
    fn id_internal<T: Variable>(
        &self,
        outcome: &OrderedSet<NodeIndex>,
        treatment: &OrderedSet<NodeIndex>,
        graph: &ADMG<T>,
    ) -> Result<Estimand<T>> {
        let topo = toposort(graph.graph(), None).map_err(|_| CausalError::Cycle)?;
        let weight = |node: NodeIndex| {
            graph
                .node_weight(node)
                .cloned()
                .ok_or(CausalError::Unidentifiable)
        };

        // Step 1
        // If no action has been taken, the effect on Y is just the marginal of the observational distribution P(v) on Y.
        if treatment.is_empty() {
            trace!("ID step 1");
            let basic = Estimand {
                value: EstimandProbabilities::Basic(
                    topo.iter().map(|x| weight(*x)).collect::<Result<_>>()?,
                    vec![],
                ),
            };

            let sumset: Vec<T> = topo
                .iter()
                .filter(|node| !outcome.contains(*node))
                .map(|node| weight(*node))
                .collect::<Result<_>>()?;

            return Ok(Estimand {
                value: EstimandProbabilities::Compose(vec![basic], sumset),
            });
        }

        // Step 2
        // If we are interested in the effect on Y (outcome), it is sufficient to restrict our
        // attention on the parts of the model ancestral to Y.
        let ancestors = graph.ancestors(outcome);
        let toposet: OrderedSet<NodeIndex> = topo.iter().copied().collect();
        let v_minus_ancestors = setdiff(&toposet, &ancestors);

        if !v_minus_ancestors.is_empty() {
            trace!(?ancestors, "ID step 2");
            let new_treatment = setintersect(treatment, &ancestors);
            let subgraph = graph.induced_subgraph(&ancestors);

            let estimand = self.id_internal(outcome, &new_treatment, &subgraph)?;

            return Ok(Estimand {
                value: EstimandProbabilities::Compose(vec![estimand], vec![]),
            });
        }

        // Step 3
        // Forces an action on any node where such an action would have no effect on Y (outcome)
        // assuming we already acted on X (treatment).
        let v_minus_treatment = setdiff(&toposet, treatment);
        let ancestors_g_upper_treatment = graph.upper_bar_variables(treatment).ancestors(outcome);
        let w = setdiff(&v_minus_treatment, &ancestors_g_upper_treatment);
        if !w.is_empty() {
            trace!(?w, "ID step 3");
            return self.id_internal(outcome, &setunion(treatment, &w), graph);
        }

        // Step 4
        // C-component factorization of the graph without the treatment variables.
        let g_minus_treatment = graph.induced_subgraph(&v_minus_treatment);
        let s = g_minus_treatment.c_components(&topo);
        if s.len() > 1 {
            trace!(components = s.len(), "ID step 4");
            let outcome_treatment = setunion(outcome, treatment);

            let sumset: Vec<T> = toposet
                .difference(&outcome_treatment)
                .map(|x| weight(*x))
                .collect::<Result<_>>()?;
            let mut product = vec![];

            for component in s.iter() {
                let v_minus_s = setdiff(&toposet, component);
                product.push(self.id_internal(component, &v_minus_s, graph)?);
            }

            return Ok(Estimand {
                value: EstimandProbabilities::Compose(product, sumset),
            });
        }

        let s0 = s.first().ok_or(CausalError::Unidentifiable)?;

        // Step 5
        // The algorithms fails due to the presence of a hedge - the graph G, and a subgraph S that does not contain any X nodes.
        let c_components_g = graph.c_components(&topo);
        if c_components_g.len() == 1 && c_components_g[0] == toposet {
            debug!("ID step 5, hedge found");
            return Err(CausalError::Hedge);
        }

        // Step 6
        // If there are no bidirected arcs from X to the other nodes in the current subproblem under consideration,
        // then we can replace acting on X by conditioning, and thus solve the subproblem.
        if c_components_g.iter().any(|c| c == s0) {
            trace!(?s0, "ID step 6");

            let sumset: Vec<T> = s0
                .difference(outcome)
                .map(|x| weight(*x))
                .collect::<Result<_>>()?;
            let mut product = vec![];
            let mut prev_nodes = vec![];

            for node in topo.iter() {
                let node_weight = weight(*node)?;
                if s0.contains(node) {
                    product.push(Estimand {
                        value: EstimandProbabilities::Basic(
                            vec![node_weight.clone()],
                            prev_nodes.clone(),
                        ),
                    });
                }
                prev_nodes.push(node_weight);
            }

            return Ok(Estimand {
                value: EstimandProbabilities::Compose(product, sumset),
            });
        }

        // Step 7
        // S is contained in a single c-component of G, recurse on that component.
        for c_component in c_components_g.iter() {
            if s0.difference(c_component).next().is_none() {
                trace!("ID step 7");
                return self.id_internal(
                    outcome,
                    &setintersect(treatment, c_component),
                    &graph.induced_subgraph(c_component),
                );
            }
        }

        Err(CausalError::Unidentifiable)
    }

    pub fn id<T: Variable>(
        &self,
        outcome: &OrderedSet<T>,
        treatment: &OrderedSet<T>,
        graph: &ADMG<T>,
    ) -> Result<Estimand<T>> {
        let select = |names: &OrderedSet<T>| -> OrderedSet<NodeIndex> {
            graph
                .node_indices()
                .filter(|i| graph.node_weight(*i).map_or(false, |w| names.contains(w)))
                .collect()
        };

        self.id_internal(&select(outcome), &select(treatment), graph)
    }

    pub fn id_index<T: Variable>(
        &self,
        outcome: &OrderedSet<NodeIndex>,
        treatment: &OrderedSet<NodeIndex>,
        graph: &ADMG<T>,
    ) -> Result<Estimand<T>> {
        self.id_internal(outcome, treatment, graph)
    }
}

/// What identification does when the effect cannot be identified from the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyPolicy {
    /// Return the backdoor estimand anyway, flagged as not identifiable.
    #[default]
    ProceedWhenUnidentifiable,
    /// Fail with [`CausalError::Hedge`].
    Abort,
}

/// Result of identifying the effect of a single treatment on a single outcome.
#[derive(Clone, Debug)]
pub struct IdentifiedEstimand<T> {
    pub treatment: T,
    pub outcome: T,
    /// Parents of the treatment, sorted. Blocks every backdoor path in a DAG.
    pub backdoor_variables: Vec<T>,
    pub id_formula: Option<Estimand<T>>,
    pub identifiable: bool,
}

impl<T> IdentifiedEstimand<T> {
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> IdentifiedEstimand<U> {
        IdentifiedEstimand {
            treatment: f(&self.treatment),
            outcome: f(&self.outcome),
            backdoor_variables: self.backdoor_variables.iter().map(&f).collect(),
            id_formula: self.id_formula.as_ref().map(|formula| formula.map(&f)),
            identifiable: self.identifiable,
        }
    }
}

impl<T: Display> Display for IdentifiedEstimand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditioning = if self.backdoor_variables.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = self.backdoor_variables.iter().map(|v| v.to_string()).collect();
            format!("|{}", names.join(","))
        };

        writeln!(f, "Estimand type: nonparametric-ate")?;
        writeln!(f)?;
        writeln!(f, "### Estimand : 1")?;
        writeln!(f, "Estimand name: backdoor")?;
        writeln!(
            f,
            "Estimand expression: d/d[{}](E[{}{}])",
            self.treatment, self.outcome, conditioning
        )?;
        writeln!(
            f,
            "Estimand assumption 1, Unconfoundedness: If U→{{{t}}} and U→{y} then P({y}|{t}{c},U) = P({y}|{t}{c})",
            t = self.treatment,
            y = self.outcome,
            c = conditioning.replacen('|', ",", 1),
        )?;
        writeln!(f)?;
        writeln!(f, "### Estimand : 2")?;
        writeln!(f, "Estimand name: id")?;
        match &self.id_formula {
            Some(formula) => write!(f, "Estimand expression: {}", formula),
            None => write!(
                f,
                "No identification formula found, proceeding with the backdoor set"
            ),
        }
    }
}

/// Identification strategies for a single treatment/outcome pair.
pub trait Identifier {
    fn identify<T: Variable + Display>(
        &self,
        graph: &ADMG<T>,
        treatment: &T,
        outcome: &T,
    ) -> Result<IdentifiedEstimand<T>>;
}

/// Backdoor adjustment on the parents of the treatment, cross-checked with the ID algorithm.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackdoorIdentifier {
    policy: IdentifyPolicy,
}

impl BackdoorIdentifier {
    pub fn new(policy: IdentifyPolicy) -> Self {
        BackdoorIdentifier { policy }
    }
}

impl Identifier for BackdoorIdentifier {
    fn identify<T: Variable + Display>(
        &self,
        graph: &ADMG<T>,
        treatment: &T,
        outcome: &T,
    ) -> Result<IdentifiedEstimand<T>> {
        let lookup = |name: &T| {
            graph
                .node_index(name)
                .ok_or_else(|| CausalError::unknown(&name.to_string(), Location::Graph))
        };
        let treatment_index = lookup(treatment)?;
        let outcome_index = lookup(outcome)?;

        let backdoor_variables: Vec<T> = graph
            .parents(treatment_index)
            .into_iter()
            .filter(|parent| *parent != outcome_index)
            .filter_map(|parent| graph.node_weight(parent).cloned())
            .collect::<OrderedSet<T>>()
            .into_iter()
            .collect();

        let treatment_set: OrderedSet<NodeIndex> = [treatment_index].iter().copied().collect();
        let outcome_set: OrderedSet<NodeIndex> = [outcome_index].iter().copied().collect();

        let (id_formula, identifiable) =
            match IDIdentifier::new().id_index(&outcome_set, &treatment_set, graph) {
                Ok(formula) => (Some(formula), true),
                Err(CausalError::Hedge) | Err(CausalError::Unidentifiable)
                    if self.policy == IdentifyPolicy::ProceedWhenUnidentifiable =>
                {
                    warn!(
                        ?treatment,
                        ?outcome,
                        "effect is not identifiable, proceeding with the backdoor set"
                    );
                    (None, false)
                }
                Err(err) => return Err(err),
            };

        debug!(?treatment, ?outcome, ?backdoor_variables, identifiable, "identified effect");

        Ok(IdentifiedEstimand {
            treatment: treatment.clone(),
            outcome: outcome.clone(),
            backdoor_variables,
            id_formula,
            identifiable,
        })
    }
}
