use crate::orders::OrderStatus;

/// Parse an order status filter, case-insensitive
pub fn parse_status(s: &str) -> Result<OrderStatus, String> {
    match s.to_ascii_uppercase().as_str() {
        "PENDING" => Ok(OrderStatus::Pending),
        "OPEN" => Ok(OrderStatus::Open),
        "FILLED" => Ok(OrderStatus::Filled),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        "REJECTED" => Ok(OrderStatus::Rejected),
        _ => Err(format!(
            "'{s}' is not an order status (pending, open, filled, cancelled, rejected)"
        )),
    }
}
