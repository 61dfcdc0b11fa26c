use super::table::{
    cell_for, Attribute, AttributeKind, ClassValue, DatasetMode, FeatureRow, FeatureTable,
    FeatureValue,
};
use super::{truncate_fixed, DatasetError, Result};
use crate::monitoring::ServiceCallDataSet;
use crate::parameters::ServiceParameters;

/// Parameters paired with their class value, before typing
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledParameters {
    pub parameters: ServiceParameters,
    pub class: ClassValue,
    pub weight: f64,
}

/// Accumulates labeled parameter sets and types them into a FeatureTable
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    mode: DatasetMode,
    instances: Vec<LabeledParameters>,
}

impl DatasetBuilder {
    pub fn new(mode: DatasetMode) -> Self {
        Self {
            mode,
            instances: Vec::new(),
        }
    }

    pub fn mode(&self) -> DatasetMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[LabeledParameters] {
        &self.instances
    }

    pub fn add_instance(&mut self, parameters: ServiceParameters, class: impl Into<ClassValue>) {
        self.add_weighted_instance(parameters, class, 1.0);
    }

    pub fn add_weighted_instance(
        &mut self,
        parameters: ServiceParameters,
        class: impl Into<ClassValue>,
        weight: f64,
    ) {
        self.instances.push(LabeledParameters {
            parameters,
            class: class.into(),
            weight,
        });
    }

    /// Add an instance whose features also include upstream return values
    ///
    /// The call's own parameters win on name collisions.
    pub fn add_instance_with_return_values(
        &mut self,
        parameters: ServiceParameters,
        return_values: &ServiceParameters,
        class: impl Into<ClassValue>,
    ) {
        let merged = if return_values.is_empty() {
            parameters
        } else {
            parameters.merge(return_values)
        };
        self.add_instance(merged, class);
    }

    /// Add an instance whose features are the parameters of a monitored execution
    pub fn add_instance_for_execution(
        &mut self,
        calls: &ServiceCallDataSet,
        service_execution_id: &str,
        class: impl Into<ClassValue>,
    ) {
        self.add_instance(calls.parameters_of(service_execution_id), class);
    }

    /// Type the accumulated instances into a table
    pub fn build(&self) -> Result<FeatureTable> {
        if self.instances.is_empty() {
            return Err(DatasetError::Empty);
        }

        let attributes = self.infer_attributes()?;

        let rows = self
            .instances
            .iter()
            .map(|instance| {
                let values = attributes
                    .iter()
                    .map(|attr| match instance.parameters.get(&attr.name) {
                        None => FeatureValue::Missing,
                        Some(value) => cell_for(attr, value).unwrap_or(FeatureValue::Missing),
                    })
                    .collect();
                Ok(FeatureRow {
                    values,
                    class: self.normalize_class(&instance.class)?,
                    weight: instance.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureTable::from_parts(attributes, rows, self.mode))
    }

    fn infer_attributes(&self) -> Result<Vec<Attribute>> {
        let mut attributes: Vec<Attribute> = Vec::new();
        for instance in &self.instances {
            for (name, value) in instance.parameters.iter() {
                let kind = AttributeKind::of(value);
                match attributes.iter_mut().find(|a| &a.name == name) {
                    None => {
                        let mut attr = Attribute::new(name.clone(), kind);
                        if kind == AttributeKind::Nominal {
                            attr.levels.push(value.as_label());
                        }
                        attributes.push(attr);
                    }
                    Some(attr) => {
                        if !attr.kind.accepts(kind) {
                            return Err(DatasetError::ConflictingAttributeType {
                                name: name.clone(),
                                expected: attr.kind,
                                found: kind,
                            });
                        }
                        if attr.kind == AttributeKind::Nominal {
                            let label = value.as_label();
                            if !attr.levels.contains(&label) {
                                attr.levels.push(label);
                            }
                        }
                    }
                }
            }
        }
        Ok(attributes)
    }

    fn normalize_class(&self, class: &ClassValue) -> Result<ClassValue> {
        match (self.mode, class) {
            (DatasetMode::NoTransformations, c) => Ok(ClassValue::Nominal(c.label())),
            (DatasetMode::NumericOnly, ClassValue::Numeric(v)) => Ok(ClassValue::Numeric(*v)),
            (DatasetMode::IntegerOnly, ClassValue::Numeric(v)) => {
                Ok(ClassValue::Numeric(truncate_fixed(*v)))
            }
            (mode, ClassValue::Nominal(label)) => Err(DatasetError::ConflictingClassType {
                value: label.clone(),
                mode,
            }),
        }
    }
}
