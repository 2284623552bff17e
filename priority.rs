/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Process-priority transitions for frame activation.
//!
//! Frame activation maps onto OS scheduling hints: the active frame's
//! process goes foreground, deactivated ones go background, and the home
//! surface is parked in a "try to keep" class so it is not aggressively
//! evicted. Hints are best-effort by design: a failed transaction is logged
//! and counted, never surfaced to the caller.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::services::{ProcessService, ServiceError};

/// Owner identity for every transaction issued by the shell.
const TRANSACTION_OWNER: &str = "systemshell";

/// OS process handle. `-1` means the backing process has not started yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid(pub i64);

impl Pid {
    pub const UNSET: Pid = Pid(-1);

    pub fn is_set(self) -> bool {
        self.0 >= 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessGroup {
    Foreground,
    Background,
    TryToKeep,
}

fn background_group(try_to_keep: bool) -> ProcessGroup {
    if try_to_keep {
        ProcessGroup::TryToKeep
    } else {
        ProcessGroup::Background
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PriorityOp {
    Assign(Pid, ProcessGroup),
    Withdraw(Pid),
}

/// An ordered, single-use batch of priority-group operations.
///
/// `commit` drives `begin .. ops .. commit` against the service, applying
/// operations in queue order and aborting on the first failure: operations
/// queued after a failed one are never attempted.
struct PriorityTransaction {
    ops: Vec<PriorityOp>,
}

impl PriorityTransaction {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn assign(mut self, pid: Pid, group: ProcessGroup) -> Self {
        self.ops.push(PriorityOp::Assign(pid, group));
        self
    }

    fn withdraw(mut self, pid: Pid) -> Self {
        self.ops.push(PriorityOp::Withdraw(pid));
        self
    }

    async fn commit(self, service: &dyn ProcessService) -> Result<(), ServiceError> {
        service.begin(TRANSACTION_OWNER).await?;
        for op in self.ops {
            match op {
                PriorityOp::Assign(pid, group) => service.assign(pid, group).await?,
                PriorityOp::Withdraw(pid) => service.withdraw(pid).await?,
            }
        }
        service.commit().await
    }
}

/// Serializes batched priority-group changes against the process service.
///
/// All entry points are fire-and-forget: failures are logged and recorded in
/// [`failed_transactions`](Self::failed_transactions), and the coordinator
/// never blocks its caller on the outcome. Transaction issuance is mutually
/// exclusive so overlapping activate/deactivate bursts from different frames
/// cannot interleave their `begin .. commit` sequences.
pub struct ProcessPriorityCoordinator {
    service: Rc<dyn ProcessService>,
    issue_lock: tokio::sync::Mutex<()>,
    failed_transactions: Cell<u64>,
}

impl ProcessPriorityCoordinator {
    pub fn new(service: Rc<dyn ProcessService>) -> Rc<Self> {
        Rc::new(Self {
            service,
            issue_lock: tokio::sync::Mutex::new(()),
            failed_transactions: Cell::new(0),
        })
    }

    /// Count of transactions abandoned after a failure. Observable stand-in
    /// for the errors this coordinator deliberately swallows.
    pub fn failed_transactions(&self) -> u64 {
        self.failed_transactions.get()
    }

    pub async fn set_foreground(&self, pid: Pid) {
        log::debug!("priority: set_foreground {pid:?}");
        self.run(
            PriorityTransaction::new().assign(pid, ProcessGroup::Foreground),
            "set_foreground",
        )
        .await;
    }

    pub async fn set_background(&self, pid: Pid, try_to_keep: bool) {
        log::debug!("priority: set_background {pid:?} keep={try_to_keep}");
        self.run(
            PriorityTransaction::new().assign(pid, background_group(try_to_keep)),
            "set_background",
        )
        .await;
    }

    pub async fn remove(&self, pid: Pid) {
        log::debug!("priority: remove {pid:?}");
        self.run(PriorityTransaction::new().withdraw(pid), "remove").await;
    }

    /// Promote one process and demote another in a single transaction.
    pub async fn move_to_foreground(&self, new_pid: Pid, old_pid: Pid, try_to_keep: bool) {
        self.run(
            PriorityTransaction::new()
                .assign(new_pid, ProcessGroup::Foreground)
                .assign(old_pid, background_group(try_to_keep)),
            "move_to_foreground",
        )
        .await;
    }

    /// Promote a replacement while clearing the entry of a process that
    /// already exited, typically behind a crashed frame.
    pub async fn when_killed(&self, killed_pid: Pid, new_pid: Pid) {
        self.run(
            PriorityTransaction::new()
                .assign(new_pid, ProcessGroup::Foreground)
                .withdraw(killed_pid),
            "when_killed",
        )
        .await;
    }

    async fn run(&self, transaction: PriorityTransaction, what: &str) {
        let _issued = self.issue_lock.lock().await;
        if let Err(error) = transaction.commit(self.service.as_ref()).await {
            self.failed_transactions.set(self.failed_transactions.get() + 1);
            log::error!("priority: {what} transaction failed: {error}");
        }
    }
}
