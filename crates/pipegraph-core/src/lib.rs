pub mod component;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod position;
pub mod reference;
pub mod task;

// Re-export commonly used types
pub use component::{
    Annotations, CommandArg, ComponentSpec, ContainerSpec, IfCondition, IfPlaceholder,
    Implementation, InputSpec, MetadataSpec, OutputSpec, Placeholder, PlaceholderRef, TypeSpec,
};
pub use error::CoreError;
pub use graph::GraphSpec;
pub use id::{EntityKind, HandleKind, VisualId};
pub use node::NodeDescriptor;
pub use position::{Position, Positioned, POSITION_ANNOTATION};
pub use reference::{ComponentReference, ReferenceSource};
pub use task::{
    ArgumentType, BinaryOperands, CachingStrategy, ExecutionOptions, GraphInputArgument,
    GraphInputRef, Predicate, RetryStrategy, TaskOutputArgument, TaskOutputRef, TaskSpec,
};
