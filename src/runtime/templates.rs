//! Simulated templates and their grouping by phase.

use crate::data::Orientation;
use ndarray::Array2;
use std::collections::HashMap;
use std::hash::Hash;

/// A simulated diffraction pattern for one phase in one orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct Template<K> {
    /// Phase identifier from the structure library.
    pub phase: K,
    /// Euler angles (rzxz, degrees) the structure was rotated by.
    pub orientation: Orientation,
    /// Simulated intensity.
    pub image: Array2<f64>,
}

/// Templates grouped by phase, each group in simulation order.
#[derive(Clone, Debug)]
pub struct TemplateLibrary<K> {
    phases: Vec<K>,
    templates: HashMap<K, Vec<Template<K>>>,
}

impl<K: Clone + Eq + Hash> TemplateLibrary<K> {
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            templates: HashMap::new(),
        }
    }

    /// Group templates by phase.
    pub fn from_templates(templates: impl IntoIterator<Item = Template<K>>) -> Self {
        let mut library = Self::new();
        library.extend(templates);
        library
    }

    pub fn push(&mut self, template: Template<K>) {
        if !self.templates.contains_key(&template.phase) {
            self.phases.push(template.phase.clone());
        }
        self.templates
            .entry(template.phase.clone())
            .or_default()
            .push(template);
    }

    /// Templates of one phase.
    pub fn get(&self, phase: &K) -> &[Template<K>] {
        self.templates.get(phase).map_or(&[], |v| v.as_slice())
    }

    /// Phases in first-seen order.
    pub fn phases(&self) -> &[K] {
        &self.phases
    }

    /// Total number of templates.
    pub fn len(&self) -> usize {
        self.templates.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K: Clone + Eq + Hash> Default for TemplateLibrary<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> Extend<Template<K>> for TemplateLibrary<K> {
    fn extend<I: IntoIterator<Item = Template<K>>>(&mut self, iter: I) {
        for template in iter {
            self.push(template);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(phase: &'static str, phi1: f64) -> Template<&'static str> {
        Template {
            phase,
            orientation: [phi1, 0.0, 0.0],
            image: Array2::zeros((2, 2)),
        }
    }

    #[test]
    fn test_grouping() {
        let library = TemplateLibrary::from_templates(vec![
            template("Si", 0.0),
            template("Ni", 0.0),
            template("Si", 10.0),
        ]);

        assert_eq!(library.len(), 3);
        assert_eq!(library.phases(), &["Si", "Ni"]);
        assert_eq!(library.get(&"Si").len(), 2);
        assert_eq!(library.get(&"Si")[1].orientation[0], 10.0);
        assert!(library.get(&"Fe").is_empty());
    }
}
