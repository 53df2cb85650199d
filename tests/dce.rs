use rdce::{ir::prelude::*, pass::dce};

/// Create a `func @test (i32 %a, i32 %b) void` populated by a callback.
fn within_func(f: impl FnOnce(&mut FunctionBuilder, Value, Value)) -> Function {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.add_input(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("test"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let (va, vb) = (func.arg_value(args[0]), func.arg_value(args[1]));
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    f(&mut builder, va, vb);
    func
}

fn count_insts(func: &Function) -> usize {
    func.layout
        .blocks()
        .map(|bb| func.layout.insts(bb).count())
        .sum()
}

#[test]
fn removes_unused_chain() {
    let mut func = within_func(|builder, a, b| {
        let x = builder.ins().add(a, b);
        let y = builder.ins().and(x, x);
        builder.ins().xor(y, y);
        builder.ins().ret();
    });

    assert!(dce::run_on_function(&mut func));
    println!("{}", func.dump());
    assert_eq!(count_insts(&func), 1);
    func.verify();
}

#[test]
fn keeps_side_effects() {
    let mut func = within_func(|builder, a, b| {
        let mut ext_sig = Signature::new();
        ext_sig.add_input(rdce::int_ty(32));
        ext_sig.set_return_type(rdce::int_ty(32));
        let ext = builder.add_extern(UnitName::global("sink"), ext_sig);
        let ptr = builder.ins().var(a);
        builder.ins().st(ptr, b);
        builder.ins().call(ext, vec![a]);
        builder.ins().add(a, b);
        builder.ins().ret();
    });

    assert!(dce::run_on_function(&mut func));
    println!("{}", func.dump());
    // The store, the call, and the variable it stores into must stay; only
    // the unused add goes away.
    assert_eq!(count_insts(&func), 4);
    func.verify();
}

#[test]
fn prunes_unreachable_blocks() {
    let mut func = within_func(|builder, _, _| {
        builder.ins().ret();
        let bb1 = builder.named_block("orphan1");
        let bb2 = builder.named_block("orphan2");
        builder.append_to(bb1);
        builder.ins().br(bb2);
        builder.append_to(bb2);
        builder.ins().br(bb1);
    });
    assert_eq!(func.layout.blocks().count(), 3);

    assert!(dce::run_on_function(&mut func));
    println!("{}", func.dump());
    assert_eq!(func.layout.blocks().count(), 1);
    assert_eq!(count_insts(&func), 1);
    func.verify();
}

#[test]
fn untouched_function_reports_unchanged() {
    let mut func = within_func(|builder, a, b| {
        let ptr = builder.ins().var(a);
        builder.ins().st(ptr, b);
        builder.ins().ret();
    });

    assert!(!dce::run_on_function(&mut func));
    assert_eq!(count_insts(&func), 3);
    func.verify();
}

#[test]
fn prune_is_a_noop_on_removed_insts() {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("test"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let va = func.arg_value(args[0]);

    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let x = builder.ins().add(va, va);
    builder.ins().ret();

    let inst = builder.func.dfg.value_inst(x);
    assert!(builder.prune_if_unused(inst));
    assert!(!builder.prune_if_unused(inst));
}
