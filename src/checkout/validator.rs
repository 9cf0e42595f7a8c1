use crate::checkout::snapshot::CartLine;
use crate::error::CheckoutError;

/// Checks every snapshot line against live stock.
///
/// Walks lines in snapshot order (ascending product id) and fails on the
/// first shortfall, so the reported product is deterministic for a given
/// cart. One failing line aborts the whole checkout; partial orders are
/// never created.
pub fn check_stock(lines: &[CartLine]) -> Result<(), CheckoutError> {
    for line in lines {
        if line.quantity > line.stock_level {
            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id,
                name: line.name.clone(),
                requested: line.quantity,
                available: line.stock_level,
            });
        }
    }

    Ok(())
}
