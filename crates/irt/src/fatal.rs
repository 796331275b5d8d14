//! Fatal Escalation
//!
//! Overflow, growth failure and (in strict or instrumented modes) reference
//! misuse cannot be reported back to native code without losing a GC root or
//! handing out a fabricated handle. They end here: dump, log, then abort or
//! panic according to the table's `FatalPolicy`.

use crate::config::FatalPolicy;
use crate::dump::TableDump;
use crate::error::IrtError;
use crate::logging::{log_event, IrtEvent};

/// Report `error` with the table contents and terminate
#[cold]
#[inline(never)]
pub(crate) fn escalate(policy: FatalPolicy, dump: &TableDump, error: &IrtError) -> ! {
    let message = error.to_string();
    log::error!(target: "irt", "{}\n{}", message, dump);
    log_event(IrtEvent::Fatal {
        table: dump.table.clone(),
        message: message.clone(),
    });

    match policy {
        FatalPolicy::Abort => std::process::abort(),
        FatalPolicy::Panic => panic!("fatal reference table error: {}", message),
    }
}
