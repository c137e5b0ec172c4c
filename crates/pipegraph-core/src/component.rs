//! Component specifications.
//!
//! A [`ComponentSpec`] declares named inputs and outputs and an
//! [`Implementation`]: either a container (a leaf step whose command line
//! references inputs/outputs through [`Placeholder`]s) or a nested
//! [`GraphSpec`]. All keyed collections use [`IndexMap`] so declaration order
//! survives every transformation.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::graph::GraphSpec;

/// Free-form annotation map attached to specs, tasks, inputs and outputs.
pub type Annotations = IndexMap<String, Value>;

fn is_false(value: &bool) -> bool {
    !*value
}

/// An input or output type: either a plain name (`"String"`) or a nested
/// structured type object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Name(String),
    Structured(IndexMap<String, Value>),
}

/// A declared component input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    /// Unique within the owning spec.
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: Annotations,
}

impl InputSpec {
    pub fn new(name: impl Into<String>) -> Self {
        InputSpec {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A declared component output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    /// Unique within the owning spec.
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: Annotations,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>) -> Self {
        OutputSpec {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Component-level metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSpec {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: Annotations,
}

// ---------------------------------------------------------------------------
// Container implementation
// ---------------------------------------------------------------------------

/// One position of a container command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandArg {
    Literal(String),
    Placeholder(Placeholder),
}

/// A command-line placeholder resolved by the pipeline compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placeholder {
    /// The value of the named input.
    InputValue(String),
    /// A local path holding the named input's data.
    InputPath(String),
    /// A local path the step writes the named output to.
    OutputPath(String),
    /// String concatenation of the nested arguments.
    Concat(Vec<CommandArg>),
    /// Conditional expansion.
    If(Box<IfPlaceholder>),
    /// `"true"` when the named (optional) input was supplied.
    IsPresent(String),
}

/// Body of an `if` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfPlaceholder {
    pub cond: IfCondition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<CommandArg>,
    #[serde(rename = "else", default, skip_serializing_if = "Vec::is_empty")]
    pub otherwise: Vec<CommandArg>,
}

/// Condition of an `if` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IfCondition {
    Constant(bool),
    Literal(String),
    Placeholder(Placeholder),
}

/// A name referenced from a placeholder, tagged with the side it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceholderRef {
    Input(String),
    Output(String),
}

impl fmt::Display for PlaceholderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderRef::Input(name) => write!(f, "input '{}'", name),
            PlaceholderRef::Output(name) => write!(f, "output '{}'", name),
        }
    }
}

impl Placeholder {
    fn collect_refs(&self, out: &mut Vec<PlaceholderRef>) {
        match self {
            Placeholder::InputValue(name)
            | Placeholder::InputPath(name)
            | Placeholder::IsPresent(name) => out.push(PlaceholderRef::Input(name.clone())),
            Placeholder::OutputPath(name) => out.push(PlaceholderRef::Output(name.clone())),
            Placeholder::Concat(parts) => {
                for part in parts {
                    part.collect_refs(out);
                }
            }
            Placeholder::If(body) => {
                if let IfCondition::Placeholder(cond) = &body.cond {
                    cond.collect_refs(out);
                }
                for arg in body.then.iter().chain(body.otherwise.iter()) {
                    arg.collect_refs(out);
                }
            }
        }
    }
}

impl CommandArg {
    fn collect_refs(&self, out: &mut Vec<PlaceholderRef>) {
        if let CommandArg::Placeholder(placeholder) = self {
            placeholder.collect_refs(out);
        }
    }
}

/// Leaf implementation: a container image and its command line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<CommandArg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<CommandArg>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        ContainerSpec {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Every input/output name referenced from `command` and `args`, in
    /// command-line order.
    pub fn placeholder_refs(&self) -> Vec<PlaceholderRef> {
        let mut refs = Vec::new();
        for arg in self.command.iter().chain(self.args.iter()) {
            arg.collect_refs(&mut refs);
        }
        refs
    }
}

/// How a component is implemented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Implementation {
    Container(ContainerSpec),
    Graph(GraphSpec),
}

// ---------------------------------------------------------------------------
// ComponentSpec
// ---------------------------------------------------------------------------

/// A reusable unit of computation with declared inputs/outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,
    pub implementation: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataSpec>,
}

impl ComponentSpec {
    /// Creates a container component running `image`.
    pub fn container(name: impl Into<String>, image: impl Into<String>) -> Self {
        ComponentSpec {
            name: Some(name.into()),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            implementation: Implementation::Container(ContainerSpec::new(image)),
            metadata: None,
        }
    }

    /// Creates a graph component wrapping `graph`.
    pub fn graph(name: impl Into<String>, graph: GraphSpec) -> Self {
        ComponentSpec {
            name: Some(name.into()),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            implementation: Implementation::Graph(graph),
            metadata: None,
        }
    }

    /// Builder: appends an input declaration.
    pub fn with_input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Builder: appends an output declaration.
    pub fn with_output(mut self, output: OutputSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Name used in diagnostics.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn is_graph(&self) -> bool {
        matches!(self.implementation, Implementation::Graph(_))
    }

    /// The nested graph, if this component is graph-implemented.
    pub fn graph_spec(&self) -> Option<&GraphSpec> {
        match &self.implementation {
            Implementation::Graph(graph) => Some(graph),
            Implementation::Container(_) => None,
        }
    }

    /// Like [`graph_spec`](Self::graph_spec) but treats a container
    /// implementation as a programmer error.
    pub fn require_graph(&self) -> Result<&GraphSpec, CoreError> {
        self.graph_spec().ok_or_else(|| CoreError::NotAGraph {
            name: self.display_name().to_string(),
        })
    }

    /// Returns a copy of this spec with its implementation replaced by `graph`.
    pub fn with_graph(&self, graph: GraphSpec) -> ComponentSpec {
        ComponentSpec {
            implementation: Implementation::Graph(graph),
            ..self.clone()
        }
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|output| output.name == name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.input(name).is_some()
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.output(name).is_some()
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|input| input.name.as_str())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|output| output.name.as_str())
    }

    /// Placeholders naming inputs/outputs this spec does not declare.
    /// Always empty for graph implementations.
    pub fn unknown_placeholders(&self) -> Vec<PlaceholderRef> {
        let container = match &self.implementation {
            Implementation::Container(container) => container,
            Implementation::Graph(_) => return Vec::new(),
        };
        container
            .placeholder_refs()
            .into_iter()
            .filter(|placeholder| match placeholder {
                PlaceholderRef::Input(name) => !self.has_input(name),
                PlaceholderRef::Output(name) => !self.has_output(name),
            })
            .collect()
    }

    /// Fails on the first placeholder that names an undeclared input/output.
    pub fn validate_placeholders(&self) -> Result<(), CoreError> {
        match self.unknown_placeholders().into_iter().next() {
            Some(placeholder) => Err(CoreError::UnknownPlaceholder { placeholder }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trainer() -> ComponentSpec {
        let mut spec = ComponentSpec::container("train", "python:3.12")
            .with_input(InputSpec::new("data"))
            .with_input(InputSpec {
                optional: true,
                ..InputSpec::new("epochs")
            })
            .with_output(OutputSpec::new("model"));
        if let Implementation::Container(container) = &mut spec.implementation {
            container.command = vec![
                CommandArg::Literal("train.py".into()),
                CommandArg::Placeholder(Placeholder::InputPath("data".into())),
                CommandArg::Placeholder(Placeholder::If(Box::new(IfPlaceholder {
                    cond: IfCondition::Placeholder(Placeholder::IsPresent("epochs".into())),
                    then: vec![
                        CommandArg::Literal("--epochs".into()),
                        CommandArg::Placeholder(Placeholder::InputValue("epochs".into())),
                    ],
                    otherwise: Vec::new(),
                }))),
                CommandArg::Placeholder(Placeholder::Concat(vec![
                    CommandArg::Literal("--out=".into()),
                    CommandArg::Placeholder(Placeholder::OutputPath("model".into())),
                ])),
            ];
        }
        spec
    }

    #[test]
    fn placeholder_refs_walk_nested_placeholders() {
        let spec = trainer();
        let container = match &spec.implementation {
            Implementation::Container(c) => c,
            _ => unreachable!(),
        };
        let refs = container.placeholder_refs();
        assert_eq!(
            refs,
            vec![
                PlaceholderRef::Input("data".into()),
                PlaceholderRef::Input("epochs".into()),
                PlaceholderRef::Input("epochs".into()),
                PlaceholderRef::Output("model".into()),
            ]
        );
        assert!(spec.validate_placeholders().is_ok());
    }

    #[test]
    fn undeclared_placeholder_is_reported() {
        let mut spec = trainer();
        spec.outputs.clear();
        let err = spec.validate_placeholders().unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownPlaceholder {
                placeholder: PlaceholderRef::Output("model".into())
            }
        );
        assert_eq!(err.to_string(), "placeholder references undeclared output 'model'");
    }

    #[test]
    fn deserializes_canonical_json_form() {
        let json = r#"{
            "name": "echo",
            "inputs": [{"name": "text", "type": "String", "default": "hi"}],
            "outputs": [{"name": "out", "type": {"GCSPath": {"data_type": "CSV"}}}],
            "implementation": {
                "container": {
                    "image": "alpine",
                    "command": ["sh", "-c", {"concat": ["echo ", {"inputValue": "text"}]}],
                    "args": [{"if": {"cond": true, "then": [{"outputPath": "out"}]}}]
                }
            }
        }"#;
        let spec: ComponentSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.name.as_deref(), Some("echo"));
        assert_eq!(spec.inputs[0].type_spec, Some(TypeSpec::Name("String".into())));
        assert!(matches!(spec.outputs[0].type_spec, Some(TypeSpec::Structured(_))));
        assert!(!spec.is_graph());
        assert!(spec.validate_placeholders().is_ok());

        let back = serde_json::to_value(&spec).unwrap();
        let reparsed: ComponentSpec = serde_json::from_value(back).unwrap();
        assert_eq!(reparsed, spec);
    }

    #[test]
    fn require_graph_rejects_container() {
        let spec = trainer();
        assert_eq!(
            spec.require_graph().unwrap_err(),
            CoreError::NotAGraph {
                name: "train".into()
            }
        );
        let graph = spec.with_graph(GraphSpec::default());
        assert!(graph.require_graph().is_ok());
        assert_eq!(graph.inputs.len(), 2);
    }
}
