use std::collections::HashMap;

use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::store::FeeStore;
use crate::types::{Discount, FeeTypeId, SessionId, StudentId};

/// one structure item joined with its fee head
#[derive(Debug, Clone)]
pub struct ResolvedFeeItem {
    pub fee_type_id: FeeTypeId,
    pub name: String,
    pub amount: Money,
    pub active: bool,
}

/// look up the fee catalogue for a (session, class) pair
///
/// Absence is an error, not an empty catalogue: the generator must skip
/// the student rather than bill zero.
pub fn resolve_structure<S: FeeStore + ?Sized>(
    store: &S,
    session_id: SessionId,
    class_name: &str,
) -> Result<Vec<ResolvedFeeItem>> {
    let structure = store
        .fee_structure(session_id, class_name)?
        .ok_or_else(|| FeeError::StructureNotFound {
            session_id,
            class: class_name.to_string(),
        })?;

    let mut items = Vec::with_capacity(structure.items.len());
    for item in &structure.items {
        let fee_type = store
            .get_fee_type(item.fee_type_id)?
            .ok_or(FeeError::FeeTypeNotFound {
                id: item.fee_type_id,
            })?;
        items.push(ResolvedFeeItem {
            fee_type_id: item.fee_type_id,
            name: fee_type.name,
            amount: item.amount,
            active: fee_type.active,
        });
    }
    Ok(items)
}

/// per-fee-head discount overrides for a student; absent head means
/// zero discount
pub fn resolve_discounts<S: FeeStore + ?Sized>(
    store: &S,
    student_id: StudentId,
    session_id: SessionId,
) -> Result<HashMap<FeeTypeId, Discount>> {
    Ok(store
        .discounts_for_student(student_id, session_id)?
        .into_iter()
        .map(|d| (d.fee_type_id, d.discount))
        .collect())
}
