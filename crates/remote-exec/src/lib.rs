pub mod console;
pub mod container;
pub mod error;
pub mod evaluator;
pub mod transport;

pub use console::ConsoleSession;
pub use container::ContainerAdapter;
pub use error::{ConsoleError, ContainerError, EvaluatorError, ScriptExecutionError, TransportError};
pub use evaluator::{EvaluatorClient, detect_script_exception};
pub use transport::{CommandOutput, RusshTransport, SshEndpoint, SshTransport};
