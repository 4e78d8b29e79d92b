// Escalation policy: maps a user's violation count to an enforcement tier.
//
// Rules are checked in this order:
//   1. exactly 25 violations -> restrict for 7 days
//   2. more than 6 violations -> ban
//   3. otherwise -> nothing
//
// NOTE: rule 2 already bans from the 7th violation on, so the restriction at 25
// is unreachable in normal progression. This is kept as-is until the owners of
// the policy decide which ordering they meant.

use super::moderation_models::EnforcementAction;
use std::time::Duration;

/// Violation count at which a user is restricted instead of banned.
pub const RESTRICT_AT_COUNT: u64 = 25;

/// Counts strictly above this are banned.
pub const BAN_ABOVE_COUNT: u64 = 6;

/// How long a restriction lasts.
pub const RESTRICT_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Pick the enforcement action for a violation count.
pub fn decide(violation_count: u64) -> EnforcementAction {
    if violation_count == RESTRICT_AT_COUNT {
        EnforcementAction::Restrict(RESTRICT_DURATION)
    } else if violation_count > BAN_ABOVE_COUNT {
        EnforcementAction::Ban
    } else {
        EnforcementAction::None
    }
}
