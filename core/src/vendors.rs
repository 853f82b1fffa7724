use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;
use tracing::warn;

use lanscope_common::vendors::VendorRepository;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

/// Loads the bundled OUI table once. A failed load is remembered so the
/// warning is only printed a single time.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("Failed to load OUI database, vendors will be unknown: {e}");
                None
            }
        })
        .as_ref()
}

/// Vendor lookups against the bundled IEEE OUI table.
pub struct MacOuiRepo;

impl VendorRepository for MacOuiRepo {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let db = get_oui_db()?;
        match db.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            Ok(None) | Err(_) => None,
        }
    }
}
