#![allow(dead_code)]

use arbor_bt::{BtNode, BtStatus, ResetContext, ResetMode, Resettable, RunContext};
use arbor_core::{Blackboard, TickContext};

/// Plays back a fixed list of statuses, repeating the last one, and records how it was driven.
#[derive(Debug, Clone)]
pub struct Scripted {
    script: Vec<BtStatus>,
    cursor: usize,
    pub runs: usize,
    pub resets: Vec<ResetMode>,
}

impl Scripted {
    pub fn new(script: impl IntoIterator<Item = BtStatus>) -> Self {
        Self {
            script: script.into_iter().collect(),
            cursor: 0,
            runs: 0,
            resets: Vec::new(),
        }
    }

    pub fn always(status: BtStatus) -> Self {
        Self::new([status])
    }
}

impl BtNode for Scripted {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> BtStatus {
        self.runs += 1;
        let status = self.script[self.cursor.min(self.script.len() - 1)];
        self.cursor += 1;
        status
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }
}

impl Resettable for Scripted {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        self.cursor = 0;
        self.resets.push(ctx.mode());
    }
}

pub fn tick(n: u64) -> TickContext {
    TickContext::new(n, 0.1)
}

pub fn board() -> Blackboard {
    Blackboard::new()
}
