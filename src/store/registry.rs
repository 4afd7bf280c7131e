use super::types::*;
use crate::compute::Formula;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Variable '{name}' is already declared")]
    DuplicateVariable { name: String },
    #[error("Variable '{name}' is not declared")]
    UnknownVariable { name: String },
    #[error("Invalid variable declarations: {0}")]
    Json(#[from] serde_json::Error),
}

/// The model: declared variables and their formulas, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar arrays indexed by VariableId
    variables: Vec<Arc<Variable>>,
    formulas: Vec<Option<Arc<dyn Formula>>>,

    used_names: HashMap<String, VariableId>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.variables.len() }

    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, RegistryError> {
        if self.used_names.contains_key(&variable.name) {
            return Err(RegistryError::DuplicateVariable { name: variable.name });
        }
        let id = VariableId::new(self.variables.len());
        self.used_names.insert(variable.name.clone(), id);
        self.variables.push(Arc::new(variable));
        self.formulas.push(None);
        Ok(id)
    }

    /// Declares a computed variable.
    pub fn add_formula_variable(
        &mut self,
        variable: Variable,
        formula: impl Formula + 'static,
    ) -> Result<VariableId, RegistryError> {
        let id = self.add_variable(variable)?;
        self.formulas[id.index()] = Some(Arc::new(formula));
        Ok(id)
    }

    pub fn set_formula(&mut self, name: &str, formula: impl Formula + 'static) -> Result<(), RegistryError> {
        let id = self.id(name).ok_or_else(|| RegistryError::UnknownVariable { name: name.to_string() })?;
        self.formulas[id.index()] = Some(Arc::new(formula));
        Ok(())
    }

    /// Declares every variable of a JSON array of variable objects.
    pub fn load_variables_json(&mut self, json: &str) -> Result<Vec<VariableId>, RegistryError> {
        let variables: Vec<Variable> = serde_json::from_str(json)?;
        let ids = variables
            .into_iter()
            .map(|v| self.add_variable(v))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = ids.len(), "loaded variable declarations");
        Ok(ids)
    }

    pub fn id(&self, name: &str) -> Option<VariableId> {
        self.used_names.get(name).copied()
    }

    #[inline(always)]
    pub fn variable(&self, id: VariableId) -> &Arc<Variable> {
        &self.variables[id.index()]
    }

    #[inline(always)]
    pub fn formula(&self, id: VariableId) -> Option<&Arc<dyn Formula>> {
        self.formulas[id.index()].as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Variable>> {
        self.id(name).map(|id| self.variable(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        (0..self.variables.len()).map(VariableId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FnFormula;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut reg = Registry::new();
        reg.add_variable(Variable::new("salary", "person", Granularity::Month)).unwrap();
        let err = reg.add_variable(Variable::new("salary", "person", Granularity::Year)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateVariable { .. }));
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_set_formula_on_declared_variable() {
        let mut reg = Registry::new();
        let id = reg.add_variable(Variable::new("salary", "person", Granularity::Month)).unwrap();
        assert!(reg.formula(id).is_none());
        reg.set_formula("salary", FnFormula::new(|_, _, _| Ok(vec![1.0]))).unwrap();
        assert!(reg.formula(id).is_some());
        assert!(matches!(
            reg.set_formula("missing", FnFormula::new(|_, _, _| Ok(vec![]))),
            Err(RegistryError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_load_variables_json() {
        let mut reg = Registry::new();
        let ids = reg
            .load_variables_json(
                r#"[
                    {"name": "salary", "entity": "person", "definition_period": "month"},
                    {"name": "birth", "entity": "person", "definition_period": "permanent"}
                ]"#,
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(reg.get("birth").unwrap().is_permanent());
        assert!(matches!(reg.load_variables_json("{"), Err(RegistryError::Json(_))));
    }
}
