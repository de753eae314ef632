//! Test helpers for fogmesh - provides topology, application and message fixtures.
//!
//! # Example
//!
//! ```rust
//! use fogmesh_test_helpers::{fixtures, MessageFactory};
//! use fogmesh_types::Direction;
//!
//! let app = fixtures::single_service_app(fixtures::APP, 500);
//! let mut factory = MessageFactory::new(&app);
//! let request = factory.make("RAW", Direction::Up, "client", fixtures::SERVICE);
//! assert_eq!(request.dest_module, fixtures::SERVICE);
//! ```

pub mod fixtures;

use fogmesh_types::{AppId, Application, Direction, Message, MessageId, UserId};

/// Builds messages for one application with sequential ids.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    app_id: AppId,
    user: UserId,
    next_id: u64,
}

impl MessageFactory {
    pub fn new(app: &Application) -> Self {
        Self {
            app_id: app.id.clone(),
            user: app.user,
            next_id: 1,
        }
    }

    /// Create a message with the next id and a 1000 byte payload.
    pub fn make(
        &mut self,
        tuple_type: &str,
        direction: Direction,
        src_module: &str,
        dest_module: &str,
    ) -> Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        let mut message = Message::new(
            id,
            self.app_id.clone(),
            self.user,
            tuple_type,
            direction,
            src_module,
            dest_module,
        );
        message.cpu_length = 1000;
        message.nw_length = 1000;
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_ids_are_sequential() {
        let app = fixtures::single_service_app(fixtures::APP, 100);
        let mut factory = MessageFactory::new(&app);
        let a = factory.make("RAW", Direction::Up, "client", fixtures::SERVICE);
        let b = factory.make("RAW", Direction::Up, "client", fixtures::SERVICE);
        assert_eq!(a.id, MessageId(1));
        assert_eq!(b.id, MessageId(2));
        assert_eq!(a.root, a.id);
    }
}
