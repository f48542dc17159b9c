//! Domain model: order and refund documents, their events, and the value
//! objects used to normalize courier and messaging fields.
pub mod aggregates;
pub mod events;
pub mod value_objects;
