use bt_core::{Blackboard, BtNode, TickContext};
use bt_tree::{BehaviorTree, Condition, ReactiveSequence};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn always_true(_ctx: &TickContext, _bb: &Blackboard) -> bool {
    true
}

fn bench_bt_tick(c: &mut Criterion) {
    let conditions = (0..32)
        .map(|_| Box::new(Condition::new(always_true)) as Box<dyn BtNode>)
        .collect::<Vec<_>>();

    let root = ReactiveSequence::new(conditions);
    let mut tree = BehaviorTree::new(Box::new(root), Blackboard::new());

    c.bench_function("bt-tree/tick(conditions=32)", |b| {
        b.iter(|| {
            black_box(tree.tick_once());
        })
    });
}

criterion_group!(benches, bench_bt_tick);
criterion_main!(benches);
