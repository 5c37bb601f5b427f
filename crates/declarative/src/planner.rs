//! Execution plan - ordered sequence of provisioning steps

use crate::error::StepError;
use crate::step::StepDescriptor;

/// An ordered list of steps. Insertion order is execution order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    steps: Vec<StepDescriptor>,
}

impl Plan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Build a plan from steps, rejecting duplicate ids.
    pub fn from_steps(steps: impl IntoIterator<Item = StepDescriptor>) -> Result<Self, StepError> {
        let mut plan = Self::new();
        for step in steps {
            plan.push(step)?;
        }
        Ok(plan)
    }

    /// Append a step. Step ids must be unique within a plan.
    pub fn push(&mut self, step: StepDescriptor) -> Result<(), StepError> {
        if self.get(step.id()).is_some() {
            return Err(StepError::configuration(format!(
                "duplicate step id '{}'",
                step.id()
            )));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Look up a step by id
    pub fn get(&self, id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepDescriptor> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Keep only steps whose id matches `target`.
    ///
    /// Target is either an exact id ("file.sensor-env") or a dotted prefix
    /// ("file" matches "file.sensor-env" and "file.device-id").
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => Self {
                steps: self
                    .steps
                    .into_iter()
                    .filter(|s| matches_target(s.id(), t))
                    .collect(),
            },
        }
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a StepDescriptor;
    type IntoIter = std::slice::Iter<'a, StepDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

fn matches_target(id: &str, target: &str) -> bool {
    id == target
        || id
            .strip_prefix(target)
            .is_some_and(|rest| rest.starts_with('.'))
}
