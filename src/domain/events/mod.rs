//! Domain events

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Return(ReturnEvent),
    Refund(RefundEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnEvent {
    Booked { order_id: String, awb: Option<String>, shipment_id: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefundEvent {
    Approved { request_id: String },
    Rejected { request_id: String, note: String },
}
