// Copyright (c) 2017-2020 Fabian Schuiki
use rdce::{
    analysis::{Range, ValueRanges},
    ir::prelude::*,
    pass::rbe,
    write::{write_function_dot, Writer},
    IntValue,
};
use std::sync::atomic::Ordering;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut func = build_function(UnitName::global("pick"));
    let ranges = build_ranges(&func);

    println!("Before:");
    Writer::new(std::io::stdout()).write_function(&func)?;

    let stats = rbe::run_with_stats(&mut func, &ranges);
    func.verify();

    println!("");
    println!("After:");
    Writer::new(std::io::stdout()).write_function(&func)?;

    println!("");
    write_function_dot(&mut std::io::stdout(), &func)?;

    println!("");
    println!(
        "Eliminated {} insts and {} blocks ({} / {} since startup)",
        stats.insts,
        stats.blocks,
        rbe::INSTS_ELIMINATED.load(Ordering::SeqCst),
        rbe::BLOCKS_ELIMINATED.load(Ordering::SeqCst),
    );
    Ok(())
}

/// Build a function which picks one of two computations based on a compare.
///
/// The compare `a < b` cannot be folded by constant folding alone, but the
/// range table built in `build_ranges` makes it statically decidable.
fn build_function(name: UnitName) -> Function {
    let mut sig = Signature::new();
    let arg1 = sig.add_input(rdce::int_ty(32));
    let arg2 = sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(name, sig);
    let a = func.arg_value(arg1);
    let b = func.arg_value(arg2);
    func.dfg.set_name(a, "a".to_string());
    func.dfg.set_name(b, "b".to_string());
    {
        let mut builder = FunctionBuilder::new(&mut func);
        let bb_entry = builder.named_block("entry");
        let bb_then = builder.named_block("then");
        let bb_else = builder.named_block("else");
        let bb_merge = builder.named_block("merge");
        builder.append_to(bb_entry);
        let c = builder.ins().name("c").slt(a, b);
        builder.ins().br_cond(c, bb_else, bb_then);
        builder.append_to(bb_then);
        let x = builder.ins().name("x").add(a, b);
        builder.ins().br(bb_merge);
        builder.append_to(bb_else);
        let y = builder.ins().name("y").sub(a, b);
        builder.ins().br(bb_merge);
        builder.append_to(bb_merge);
        let p = builder
            .ins()
            .name("p")
            .phi(vec![x, y], vec![bb_then, bb_else]);
        builder.ins().ret_value(p);
    }
    func.verify();
    func
}

/// Build the range table a range analysis would have produced: `a` is known
/// to lie in `[0, 5]` and `b` in `[10, 20]`, so `a < b` always holds.
fn build_ranges(func: &Function) -> ValueRanges {
    let args: Vec<_> = func.sig.args().collect();
    let a = func.arg_value(args[0]);
    let b = func.arg_value(args[1]);
    let mut ranges = ValueRanges::new();
    ranges.set(
        a,
        Range::new(IntValue::from_usize(32, 0), IntValue::from_usize(32, 5)),
    );
    ranges.set(
        b,
        Range::new(IntValue::from_usize(32, 10), IntValue::from_usize(32, 20)),
    );
    ranges
}
