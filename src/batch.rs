//! Character-budgeted request batching
//!
//! Blocks are packed per containing type so a class's flagged members travel
//! together with its summary. Locality of context wins over tight packing:
//! members that don't fit the current batch are deferred whole to the next
//! pass instead of being split across the remaining space of other types.

use crate::index::{innermost_container, CodeBlock};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Default per-batch budget in characters
pub const DEFAULT_BATCH_CHAR_LIMIT: usize = 20_000;

/// Result of splitting blocks into request batches
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchPlan {
    pub batches: Vec<Vec<CodeBlock>>,
    /// Blocks larger than the budget on their own; never batched
    pub skipped: Vec<CodeBlock>,
    /// Human-readable outcome
    pub advisory: String,
}

impl BatchPlan {
    /// Every block in the plan, batched ones first then skipped ones
    pub fn all_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.batches.iter().flatten().chain(self.skipped.iter())
    }

    pub fn batch_size(batch: &[CodeBlock]) -> usize {
        batch.iter().map(CodeBlock::size).sum()
    }
}

/// A container and the members still waiting for a batch
struct Group {
    /// `None` for members batched without class context
    container: Option<CodeBlock>,
    /// The container carries its own findings and hasn't been sent yet
    header_pending: bool,
    members: VecDeque<CodeBlock>,
}

impl Group {
    fn header_size(&self) -> usize {
        self.container.as_ref().map(CodeBlock::size).unwrap_or(0)
    }

    fn has_queued(&self) -> bool {
        self.header_pending || !self.members.is_empty()
    }

    fn label(&self) -> String {
        match &self.container {
            Some(c) => format!("type at line {}", c.start_line()),
            None => "blocks without type context".to_string(),
        }
    }
}

/// Split blocks into batches whose total size stays within `budget`.
pub fn plan_batches(blocks: &[CodeBlock], budget: usize) -> BatchPlan {
    let mut skipped = Vec::new();
    let mut groups = partition(blocks, budget, &mut skipped);
    let mut batches: Vec<Vec<CodeBlock>> = Vec::new();

    while groups.iter().any(Group::has_queued) {
        let mut batch = Vec::new();
        let mut used = 0usize;

        for group in groups.iter_mut().filter(|g| g.has_queued()) {
            let remaining = budget.saturating_sub(used);
            let header = group.header_size();
            if header > remaining {
                warn!("deferring {} to the next batch", group.label());
                continue;
            }

            let mut size = header;
            let mut taken = Vec::new();
            while let Some(front) = group.members.front() {
                if size + front.size() > remaining {
                    break;
                }
                size += front.size();
                if let Some(member) = group.members.pop_front() {
                    taken.push(member);
                }
            }

            if taken.is_empty() && !group.header_pending {
                warn!("deferring {} to the next batch", group.label());
                continue;
            }

            if let Some(container) = &group.container {
                batch.push(container.clone());
            }
            group.header_pending = false;
            debug!("added {} with {} block(s) to batch", group.label(), taken.len());
            batch.extend(taken);
            used += size;

            if !group.members.is_empty() {
                warn!(
                    "deferring {} remaining block(s) of {}",
                    group.members.len(),
                    group.label()
                );
            }
        }

        if batch.is_empty() {
            // Unreachable given partition(), but never spin or emit an empty batch
            warn!("unable to add any blocks to a batch; stopping");
            break;
        }

        info!("created batch with approx. {} chars", used);
        batches.push(batch);
    }

    let advisory = advisory(batches.len(), &skipped, budget);
    BatchPlan {
        batches,
        skipped,
        advisory,
    }
}

/// Assign members to their innermost container, routing anything that can
/// never fit to `skipped` and anything that can't fit beside its container to
/// a context-free group.
fn partition(blocks: &[CodeBlock], budget: usize, skipped: &mut Vec<CodeBlock>) -> Vec<Group> {
    let containers: Vec<&CodeBlock> = blocks.iter().filter(|b| b.is_container()).collect();

    let mut groups: Vec<Group> = containers
        .iter()
        .map(|&container| {
            let oversized = container.size() > budget;
            if oversized && container.has_findings() {
                warn!(
                    start_line = container.start_line(),
                    size = container.size(),
                    "type summary too large to send, skipping"
                );
                skipped.push(container.clone());
            }
            Group {
                container: (!oversized).then(|| container.clone()),
                header_pending: container.has_findings() && !oversized,
                members: VecDeque::new(),
            }
        })
        .collect();

    let mut context_free = Group {
        container: None,
        header_pending: false,
        members: VecDeque::new(),
    };

    for member in blocks.iter().filter(|b| !b.is_container()) {
        if member.size() > budget {
            warn!(
                start_line = member.start_line(),
                kind = %member.kind,
                size = member.size(),
                "block too large to send, skipping"
            );
            skipped.push(member.clone());
            continue;
        }

        let group = innermost_container(&containers, member).map(|idx| &mut groups[idx]);
        match group {
            Some(group)
                if group
                    .container
                    .as_ref()
                    .is_some_and(|c| c.size() + member.size() <= budget) =>
            {
                group.members.push_back(member.clone());
            }
            Some(_) => {
                warn!(
                    start_line = member.start_line(),
                    "block does not fit beside its type summary; sending without type context"
                );
                context_free.members.push_back(member.clone());
            }
            None => context_free.members.push_back(member.clone()),
        }
    }

    if !context_free.members.is_empty() {
        groups.push(context_free);
    }
    groups
}

fn advisory(batch_count: usize, skipped: &[CodeBlock], budget: usize) -> String {
    let mut message = String::new();

    if batch_count == 0 {
        if skipped.is_empty() {
            message.push_str("No code blocks were found to process.");
        } else {
            message.push_str(&format!(
                "Unable to process your code: all {} {} the size limit of {} characters.",
                skipped.len(),
                if skipped.len() == 1 { "block exceeds" } else { "blocks exceed" },
                budget
            ));
        }
        return message;
    }

    message.push_str(&format!(
        "Due to size limits, your code was split into {} {}.\n\
         All detected issues that fit will be sent for refactoring.",
        batch_count,
        if batch_count == 1 { "batch" } else { "batches" }
    ));

    if !skipped.is_empty() {
        message.push_str(&format!(
            "\n{} {} too large to process and {} skipped.",
            skipped.len(),
            if skipped.len() == 1 { "block was" } else { "blocks were" },
            if skipped.len() == 1 { "was" } else { "were" }
        ));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Finding;
    use crate::index::{BlockKind, BlockSpan};
    use std::path::PathBuf;

    fn block(kind: BlockKind, start: usize, end: usize, size: usize, flagged: bool) -> CodeBlock {
        CodeBlock {
            file_path: PathBuf::from("A.java"),
            kind,
            span: BlockSpan::new(start, end).unwrap(),
            text: "x".repeat(size),
            findings: if flagged {
                vec![Finding::new(start, "Rule", "msg")]
            } else {
                Vec::new()
            },
        }
    }

    fn method(start: usize, end: usize, size: usize) -> CodeBlock {
        block(BlockKind::Method, start, end, size, true)
    }

    fn class(start: usize, end: usize, size: usize) -> CodeBlock {
        block(BlockKind::Type, start, end, size, false)
    }

    fn spans(batch: &[CodeBlock]) -> Vec<(usize, usize)> {
        batch.iter().map(|b| (b.start_line(), b.end_line())).collect()
    }

    fn assert_budget_invariants(plan: &BatchPlan, budget: usize) {
        for batch in &plan.batches {
            assert!(!batch.is_empty());
            assert!(BatchPlan::batch_size(batch) <= budget);
        }
        for block in &plan.skipped {
            assert!(block.size() > budget);
        }
    }

    #[test]
    fn test_oversized_block_is_skipped_and_small_one_batched() {
        let a = method(2, 10, 500);
        let b = method(12, 400, 24_000);
        let plan = plan_batches(&[a.clone(), b.clone()], 20_000);

        assert_eq!(plan.batches, vec![vec![a]]);
        assert_eq!(plan.skipped, vec![b]);
        assert!(plan.advisory.contains("1 batch."));
        assert!(plan.advisory.contains("1 block was too large"));
        assert_budget_invariants(&plan, 20_000);
    }

    #[test]
    fn test_members_travel_with_their_class() {
        let blocks = vec![
            class(1, 50, 100),
            class(60, 90, 100),
            method(2, 10, 300),
            method(62, 70, 300),
            method(20, 30, 300),
        ];
        let plan = plan_batches(&blocks, 20_000);

        assert_eq!(plan.batches.len(), 1);
        assert_eq!(
            spans(&plan.batches[0]),
            vec![(1, 50), (2, 10), (20, 30), (60, 90), (62, 70)]
        );
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn test_deferred_members_repeat_class_context() {
        let blocks = vec![
            class(1, 100, 100),
            method(2, 10, 600),
            method(20, 30, 600),
            method(40, 50, 600),
        ];
        let plan = plan_batches(&blocks, 1_400);

        assert_eq!(plan.batches.len(), 2);
        assert_eq!(spans(&plan.batches[0]), vec![(1, 100), (2, 10), (20, 30)]);
        assert_eq!(spans(&plan.batches[1]), vec![(1, 100), (40, 50)]);
        assert!(plan.advisory.contains("2 batches."));
        assert_budget_invariants(&plan, 1_400);
    }

    #[test]
    fn test_member_goes_to_innermost_type() {
        let blocks = vec![
            class(1, 100, 50),
            class(20, 40, 50),
            method(25, 30, 100),
        ];
        let plan = plan_batches(&blocks, 1_000);
        assert_eq!(spans(&plan.batches[0]), vec![(20, 40), (25, 30)]);
    }

    #[test]
    fn test_flagged_type_without_members_is_sent() {
        let mut flagged = class(1, 20, 200);
        flagged.findings.push(Finding::new(1, "GodClass", "too big"));
        let plan = plan_batches(&[flagged.clone()], 1_000);
        assert_eq!(plan.batches, vec![vec![flagged]]);
    }

    #[test]
    fn test_member_too_big_for_class_context_goes_alone() {
        let blocks = vec![class(1, 100, 400), method(2, 50, 800)];
        let plan = plan_batches(&blocks, 1_000);
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(spans(&plan.batches[0]), vec![(2, 50)]);
        assert!(plan.skipped.is_empty());
        assert_budget_invariants(&plan, 1_000);
    }

    #[test]
    fn test_context_only_types_produce_no_batches() {
        let plan = plan_batches(&[class(1, 10, 50)], 1_000);
        assert!(plan.batches.is_empty());
        assert_eq!(plan.advisory, "No code blocks were found to process.");
    }

    #[test]
    fn test_empty_input() {
        let plan = plan_batches(&[], 1_000);
        assert!(plan.batches.is_empty());
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.advisory, "No code blocks were found to process.");
    }

    #[test]
    fn test_everything_oversized() {
        let plan = plan_batches(&[method(1, 5, 300), method(7, 9, 400)], 200);
        assert!(plan.batches.is_empty());
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(
            plan.advisory,
            "Unable to process your code: all 2 blocks exceed the size limit of 200 characters."
        );
    }

    #[test]
    fn test_no_block_lost_on_skewed_input() {
        let mut blocks = vec![class(1, 1000, 300), class(1001, 2000, 300)];
        for i in 0..20 {
            let start = 2 + i * 40;
            blocks.push(method(start, start + 30, 150 + i * 37));
            blocks.push(method(1002 + i * 40, 1032 + i * 40, 900 - i * 20));
        }
        let budget = 2_000;
        let plan = plan_batches(&blocks, budget);
        assert_budget_invariants(&plan, budget);

        let members_out = plan
            .all_blocks()
            .filter(|b| !b.is_container())
            .count();
        assert_eq!(members_out, 40);
    }
}
