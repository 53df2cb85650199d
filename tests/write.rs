// Copyright (c) 2017-2020 Fabian Schuiki

#[macro_use]
extern crate indoc;

use rdce::{
    analysis::{Range, ValueRanges},
    ir::prelude::*,
    ir::InstData,
    pass::rbe,
    write::{write_function_dot, Writer},
    IntValue,
};

fn print_function(func: &Function) -> String {
    let mut v = Vec::new();
    Writer::new(&mut v).write_function(func).unwrap();
    String::from_utf8(v).unwrap()
}

fn print_module(module: &Module) -> String {
    let mut v = Vec::new();
    Writer::new(&mut v).write_module(module).unwrap();
    String::from_utf8(v).unwrap()
}

fn diamond(name: &str) -> (Function, Value, Value) {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global(name), sig);
    let args: Vec<_> = func.sig.args().collect();
    let (va, vb) = (func.arg_value(args[0]), func.arg_value(args[1]));
    func.dfg.set_name(va, "a".to_string());
    func.dfg.set_name(vb, "b".to_string());

    let mut builder = FunctionBuilder::new(&mut func);
    let bb_entry = builder.named_block("entry");
    let bb_then = builder.named_block("then");
    let bb_else = builder.named_block("else");
    let bb_merge = builder.named_block("merge");
    builder.append_to(bb_entry);
    let c = builder.ins().name("c").slt(va, vb);
    builder.ins().br_cond(c, bb_else, bb_then);
    builder.append_to(bb_then);
    let x = builder.ins().name("x").add(va, vb);
    builder.ins().br(bb_merge);
    builder.append_to(bb_else);
    let y = builder.ins().name("y").sub(va, vb);
    builder.ins().br(bb_merge);
    builder.append_to(bb_merge);
    let p = builder
        .ins()
        .name("p")
        .phi(vec![x, y], vec![bb_then, bb_else]);
    builder.ins().ret_value(p);

    (func, va, vb)
}

#[test]
fn function_assembly() {
    let (func, _, _) = diamond("diamond");
    assert_eq!(
        print_function(&func),
        indoc! {"
            func @diamond (i32 %a, i32 %b) i32 {
            entry:
                %c = slt i32 %a, %b
                br %c, %else, %then
            then:
                %x = add i32 %a, %b
                br %merge
            else:
                %y = sub i32 %a, %b
                br %merge
            merge:
                %p = phi i32 [%x, %then], [%y, %else]
                ret i32 %p
            }
        "}
    );
}

#[test]
fn module_with_declaration_and_calls() {
    let mut sink_sig = Signature::new();
    sink_sig.add_input(rdce::int_ty(32));
    sink_sig.set_return_type(rdce::int_ty(32));

    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("caller"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let va = func.arg_value(args[0]);
    func.dfg.set_name(va, "a".to_string());

    let mut builder = FunctionBuilder::new(&mut func);
    let sink = builder.add_extern(UnitName::global("sink"), sink_sig.clone());
    let mut log_sig = Signature::new();
    log_sig.add_input(rdce::int_ty(32));
    let log = builder.add_extern(UnitName::global("log"), log_sig);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let r = builder.ins().name("r").call(sink, vec![va]);
    builder.build_inst(
        InstData::Call {
            opcode: Opcode::Call,
            unit: log,
            ins: 1,
            args: vec![va],
        },
        rdce::void_ty(),
    );
    builder.ins().ret_value(r);

    let mut module = Module::new();
    module.declare(UnitName::global("sink"), sink_sig);
    module.add_function(func);
    module.verify();

    assert_eq!(
        print_module(&module),
        indoc! {"
            declare @sink (i32) i32

            func @caller (i32 %a) i32 {
            entry:
                %r = call i32 @sink (i32 %a)
                call void @log (i32 %a)
                ret i32 %r
            }
        "}
    );
}

#[test]
fn anonymous_names_are_sequential() {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("anon"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let (va, vb) = (func.arg_value(args[0]), func.arg_value(args[1]));

    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.block();
    builder.append_to(bb);
    let x = builder.ins().add(va, vb);
    builder.ins().ret_value(x);

    assert_eq!(
        print_function(&func),
        indoc! {"
            func @anon (i32 %0, i32 %1) i32 {
            2:
                %3 = add i32 %0, %1
                ret i32 %3
            }
        "}
    );
}

#[test]
fn duplicate_names_are_uniquified() {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("dup"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let va = func.arg_value(args[0]);
    func.dfg.set_name(va, "a".to_string());

    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let x1 = builder.ins().name("x").add(va, va);
    let x2 = builder.ins().name("x").add(x1, va);
    builder.ins().ret_value(x2);

    assert_eq!(
        print_function(&func),
        indoc! {"
            func @dup (i32 %a) i32 {
            entry:
                %x = add i32 %a, %a
                %x1 = add i32 %x, %a
                ret i32 %x1
            }
        "}
    );
}

#[test]
fn special_characters_are_escaped() {
    let mut sig = Signature::new();
    sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(UnitName::global("esc"), sig);
    let args: Vec<_> = func.sig.args().collect();
    let va = func.arg_value(args[0]);
    func.dfg.set_name(va, "in.x".to_string());

    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let x = builder.ins().name("out y").add(va, va);
    builder.ins().ret_value(x);

    assert_eq!(
        print_function(&func),
        indoc! {r#"
            func @esc (i32 %in.x) i32 {
            entry:
                %out\20y = add i32 %in.x, %in.x
                ret i32 %out\20y
            }
        "#}
    );
}

#[test]
fn dot_graph() {
    let mut func = Function::new(UnitName::global("tiny"), Signature::new());
    let mut builder = FunctionBuilder::new(&mut func);
    let bb0 = builder.named_block("entry");
    let bb1 = builder.named_block("next");
    builder.append_to(bb0);
    builder.ins().br(bb1);
    builder.append_to(bb1);
    builder.ins().ret();

    let mut v = Vec::new();
    write_function_dot(&mut v, &func).unwrap();
    assert_eq!(
        String::from_utf8(v).unwrap(),
        indoc! {r#"
            digraph "CFG for '@tiny' function" {
                bb0 [shape=record, label="{entry:\l\lbr next\l}"];
                bb1 [shape=record, label="{next:\l\lret\l}"];
                bb0 -> bb1;
            }
        "#}
    );
}

#[test]
fn assembly_after_elimination() {
    let (mut func, va, vb) = diamond("diamond");
    let mut ranges = ValueRanges::new();
    ranges.set(
        va,
        Range::new(IntValue::from_usize(32, 0), IntValue::from_usize(32, 5)),
    );
    ranges.set(
        vb,
        Range::new(IntValue::from_usize(32, 10), IntValue::from_usize(32, 20)),
    );
    assert!(rbe::run_on_function(&mut func, &ranges));

    assert_eq!(
        print_function(&func),
        indoc! {"
            func @diamond (i32 %a, i32 %b) i32 {
            entry:
                br %then
            then:
                %x = add i32 %a, %b
                br %merge
            merge:
                %p = phi i32 [%x, %then]
                ret i32 %p
            }
        "}
    );
}
