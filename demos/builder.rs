// Copyright (c) 2017-2020 Fabian Schuiki
use rdce::ir::prelude::*;
use rdce::pass::dce;

fn main() {
    env_logger::init();
    let mut func = build_function(UnitName::global("foo"));
    println!("{}", func.dump());
    println!("");
    println!("Dead Code Elimination");
    println!("");
    dce::run_on_function(&mut func);
    println!("{}", func.dump());
}

fn build_function(name: UnitName) -> Function {
    let mut sig = Signature::new();
    let arg1 = sig.add_input(rdce::int_ty(32));
    let arg2 = sig.add_input(rdce::int_ty(32));
    sig.set_return_type(rdce::int_ty(32));
    let mut func = Function::new(name, sig);
    let arg1 = func.arg_value(arg1);
    let arg2 = func.arg_value(arg2);
    {
        let mut builder = FunctionBuilder::new(&mut func);
        let bb1 = builder.block();
        let bb2 = builder.block();
        builder.append_to(bb1);
        let v1 = builder.ins().const_int((32, 4));
        let v2 = builder.ins().const_int((32, 5));
        let v3 = builder.ins().add(v1, v2);
        let v8 = builder.ins().umul(arg1, v3);
        let v9 = builder.ins().not(v8);
        builder.ins().neg(v9);
        builder.ins().br(bb2);
        builder.append_to(bb2);
        let v4 = builder.ins().const_int((32, 1));
        let v5 = builder.ins().add(v3, v4);
        let v6 = builder.ins().add(v5, arg1);
        let v7 = builder.ins().add(arg2, v6);
        builder.ins().ult(v3, v4);
        builder.ins().ugt(v3, v4);
        builder.ins().ule(v3, v4);
        builder.ins().uge(v3, v4);
        builder.ins().ret_value(v7);
    }
    func.verify();
    func
}
