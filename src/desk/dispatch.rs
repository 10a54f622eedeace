//! Forwarding of student requests to administrators.

use tracing::{info, warn};

use crate::desk::messenger::Messenger;
use crate::desk::profile::UserProfile;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<i64>,
    pub failed: Vec<i64>,
}

/// Build the notification administrators receive.
pub fn format_request(profile: &UserProfile, body: &str) -> String {
    format!(
        "📩 Yangi murojaat\n\n\
         👤 Talaba: {}\n\
         🏫 Fakultet: {}\n\
         🎓 Guruh: {}\n\
         📞 Tel: {}\n\n\
         ✉️ Murojaat:\n{}",
        profile.full_name, profile.faculty, profile.group, profile.phone, body
    )
}

/// Send the request to every administrator, one attempt each.
///
/// A failed delivery is logged and skipped; it never stops the loop and is
/// not retried.
pub async fn dispatch_request(
    messenger: &dyn Messenger,
    admin_ids: &[i64],
    profile: &UserProfile,
    body: &str,
) -> DispatchReport {
    let text = format_request(profile, body);
    let mut report = DispatchReport::default();

    for &admin_id in admin_ids {
        match messenger.send(admin_id, &text, None).await {
            Ok(()) => report.delivered.push(admin_id),
            Err(e) => {
                warn!(admin_id, user_id = profile.user_id, "Failed to forward request: {e}");
                report.failed.push(admin_id);
            }
        }
    }

    info!(
        user_id = profile.user_id,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "Request dispatched"
    );
    report
}
