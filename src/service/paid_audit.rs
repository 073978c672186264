use crate::models::audit::PaidTransition;
use crate::models::invoice::PaidStatus;

/// 真实迁移判定: 新状态为 PAID 且旧状态不是 PAID
///
/// 其余一律静默 (UNPAID→PARTIALLY_PAID、PAID→PAID 重存、PAID→UNPAID 冲正等)。
pub fn is_genuine_transition(old: PaidStatus, new: PaidStatus) -> bool {
    new == PaidStatus::Paid && old != PaidStatus::Paid
}

impl PaidTransition {
    /// 仅当构成真实迁移时返回待落库的审计记录
    pub fn genuine(
        invoice_id: i64,
        user_id: Option<i64>,
        old_status: PaidStatus,
        new_status: PaidStatus,
    ) -> Option<Self> {
        if !is_genuine_transition(old_status, new_status) {
            return None;
        }

        Some(PaidTransition {
            invoice_id,
            user_id,
            old_status,
            new_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaid_to_paid_is_genuine() {
        let t = PaidTransition::genuine(1, Some(7), PaidStatus::Unpaid, PaidStatus::Paid).unwrap();
        assert_eq!(t.old_status, PaidStatus::Unpaid);
        assert_eq!(t.new_status, PaidStatus::Paid);
        assert_eq!(t.user_id, Some(7));
    }

    #[test]
    fn partially_paid_to_paid_is_genuine() {
        assert!(PaidTransition::genuine(1, None, PaidStatus::PartiallyPaid, PaidStatus::Paid).is_some());
    }

    #[test]
    fn paid_to_paid_resave_is_silent() {
        assert!(PaidTransition::genuine(1, Some(7), PaidStatus::Paid, PaidStatus::Paid).is_none());
    }

    #[test]
    fn transitions_not_into_paid_are_silent() {
        assert!(PaidTransition::genuine(1, None, PaidStatus::Unpaid, PaidStatus::PartiallyPaid).is_none());
        assert!(PaidTransition::genuine(1, None, PaidStatus::Paid, PaidStatus::Unpaid).is_none());
        assert!(PaidTransition::genuine(1, None, PaidStatus::PartiallyPaid, PaidStatus::PartiallyPaid).is_none());
    }

    #[test]
    fn system_initiated_transition_records_no_actor() {
        let t = PaidTransition::genuine(9, None, PaidStatus::Unpaid, PaidStatus::Paid).unwrap();
        assert_eq!(t.user_id, None);
    }
}
