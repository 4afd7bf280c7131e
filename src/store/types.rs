use crate::periods::{DateUnit, Instant, Period};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Declared temporal resolution of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Permanent,
    Month,
    Year,
}

impl Granularity {
    /// The period unit a periodic variable is cached at.
    pub fn unit(self) -> Option<DateUnit> {
        match self {
            Granularity::Permanent => None,
            Granularity::Month => Some(DateUnit::Month),
            Granularity::Year => Some(DateUnit::Year),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Permanent => "permanent",
            Granularity::Month => "month",
            Granularity::Year => "year",
        })
    }
}

/// Cell type applied when arrays leave the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Float,
    Int,
    Bool,
    Enum(Vec<String>),
}

/// How `Simulation::calculate_output` answers for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    Compute,
    Add,
    Divide,
}

/// How an input spanning several cache units is spread over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBehavior {
    #[default]
    Direct,
    DispatchByPeriod,
    DivideByPeriod,
}

/// One extra discrete argument of a parameterised variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self { ParamValue::Int(v) }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self { ParamValue::Bool(v) }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self { ParamValue::Text(v.to_string()) }
}

/// Ordered extra-parameter tuple; empty means "no extra parameters".
pub type ExtraParams = SmallVec<[ParamValue; 2]>;

/// Declared metadata of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub entity: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub default_value: f64,
    pub definition_period: Granularity,
    #[serde(default)]
    pub start: Option<Instant>,
    #[serde(default)]
    pub end: Option<Instant>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub calculate_output: OutputMode,
    #[serde(default)]
    pub set_input: InputBehavior,
}

impl Variable {
    pub fn new(name: impl Into<String>, entity: impl Into<String>, definition_period: Granularity) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            value_type: ValueType::Float,
            default_value: 0.0,
            definition_period,
            start: None,
            end: None,
            label: None,
            calculate_output: OutputMode::Compute,
            set_input: InputBehavior::Direct,
        }
    }

    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_window(mut self, start: Option<Instant>, end: Option<Instant>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_output(mut self, mode: OutputMode) -> Self {
        self.calculate_output = mode;
        self
    }

    pub fn with_input(mut self, behavior: InputBehavior) -> Self {
        self.set_input = behavior;
        self
    }

    #[inline]
    pub fn is_permanent(&self) -> bool {
        self.definition_period == Granularity::Permanent
    }

    /// True when `period` overlaps `[start, end]`; missing bounds are open.
    pub fn in_window(&self, period: &Period) -> bool {
        period.intersects(self.start, self.end)
    }

    /// Renders one cell according to `value_type`.
    pub fn cell_to_json(&self, cell: f64, use_label: bool) -> serde_json::Value {
        use serde_json::Value;
        match &self.value_type {
            ValueType::Float => serde_json::Number::from_f64(cell).map_or(Value::Null, Value::Number),
            ValueType::Int => Value::from(cell as i64),
            ValueType::Bool => Value::Bool(cell != 0.0),
            ValueType::Enum(labels) => {
                let index = cell as i64;
                if use_label {
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| labels.get(i))
                        .map_or(Value::from(index), |label| Value::String(label.clone()))
                } else {
                    Value::from(index)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variable_from_json_uses_defaults() {
        let var: Variable = serde_json::from_value(json!({
            "name": "salary",
            "entity": "person",
            "definition_period": "month",
            "start": "2015-01-01",
        }))
        .unwrap();
        assert_eq!(var.definition_period, Granularity::Month);
        assert_eq!(var.value_type, ValueType::Float);
        assert_eq!(var.set_input, InputBehavior::Direct);
        assert_eq!(var.start, Some(Instant::new(2015, 1, 1).unwrap()));
        assert_eq!(var.end, None);
    }

    #[test]
    fn test_enum_and_behaviours_from_json() {
        let var: Variable = serde_json::from_value(json!({
            "name": "housing",
            "entity": "household",
            "definition_period": "year",
            "value_type": {"enum": ["tenant", "owner"]},
            "calculate_output": "divide",
            "set_input": "divide_by_period",
        }))
        .unwrap();
        assert_eq!(var.value_type, ValueType::Enum(vec!["tenant".into(), "owner".into()]));
        assert_eq!(var.calculate_output, OutputMode::Divide);
        assert_eq!(var.set_input, InputBehavior::DivideByPeriod);
    }

    #[test]
    fn test_cell_rendering_by_type() {
        let float = Variable::new("a", "person", Granularity::Year);
        assert_eq!(float.cell_to_json(1.5, false), json!(1.5));

        let int = float.clone().with_value_type(ValueType::Int);
        assert_eq!(int.cell_to_json(3.0, false), json!(3));

        let boolean = float.clone().with_value_type(ValueType::Bool);
        assert_eq!(boolean.cell_to_json(0.0, false), json!(false));

        let labels = float.with_value_type(ValueType::Enum(vec!["tenant".into(), "owner".into()]));
        assert_eq!(labels.cell_to_json(1.0, false), json!(1));
        assert_eq!(labels.cell_to_json(1.0, true), json!("owner"));
        assert_eq!(labels.cell_to_json(7.0, true), json!(7));
    }

    #[test]
    fn test_param_values_deserialize_untagged() {
        let params: Vec<ParamValue> = serde_json::from_value(json!([true, 3, "a"])).unwrap();
        assert_eq!(params, vec![ParamValue::Bool(true), ParamValue::Int(3), ParamValue::from("a")]);
    }

    #[test]
    fn test_window_is_inclusive_and_open_ended() {
        let var = Variable::new("a", "person", Granularity::Year)
            .with_window(Some(Instant::new(2015, 1, 1).unwrap()), None);
        assert!(var.in_window(&Period::year(2015).unwrap()));
        assert!(var.in_window(&Period::year(2100).unwrap()));
        assert!(!var.in_window(&Period::year(2014).unwrap()));
    }
}
