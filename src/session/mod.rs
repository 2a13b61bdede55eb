pub mod connection;
pub mod controller;
pub mod dispatcher;
pub mod state;

pub use connection::{ConnectionEvent, ConnectionManager, SessionEvent};
pub use controller::SessionController;
pub use dispatcher::MessageDispatcher;
pub use state::{
    BenchmarkRun, BenchmarkStatus, ConnectionStatus, SessionSnapshot, SessionStore,
    BENCHMARK_INITIAL_PROGRESS,
};
