pub mod dispatcher;
pub mod logging;
pub mod messages;
pub mod producer;

pub use dispatcher::EventDispatcher;
pub use logging::LoggingEventPublisher;
pub use producer::KafkaEventProducer;
