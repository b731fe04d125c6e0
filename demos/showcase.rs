//! Registers a handful of native functions on the host global object and
//! drives them the way host code would.
//!
//! Run with `HOSTBRIDGE_LOG_LEVEL=debug` to see the bridge trace.

use hostbridge::types::{self, struct_of, Field, FuncType, IntWidth, REGISTRY};
use hostbridge::{global, wrap_as_host_function, BridgeResult, HostValue, NativeFunction, NativeValue};

fn int(n: i64) -> NativeValue {
    NativeValue::Int(IntWidth::Isize, n)
}

fn binary_op() -> FuncType {
    FuncType::new(vec![types::int(), types::int()], vec![types::int()])
}

fn add() -> NativeFunction {
    NativeFunction::new(binary_op(), |args| {
        Ok(vec![int(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0))])
    })
    .named("add")
}

fn register() -> BridgeResult<()> {
    let global = global();
    let op = types::func(binary_op());

    let get_adder = NativeFunction::new(FuncType::new(vec![], vec![op.clone()]), |_| {
        Ok(vec![NativeValue::func(add())])
    })
    .named("getAdder");

    let apply = NativeFunction::new(
        FuncType::new(vec![types::int(), types::int(), op], vec![types::int()]),
        |mut args| {
            let op = args.pop().unwrap_or(NativeValue::Bool(false));
            match op.as_func() {
                Some(f) => f.call(args),
                None => Ok(vec![int(0)]),
            }
        },
    )
    .named("do");

    let variadic_in = NativeFunction::new(
        FuncType::variadic(vec![], types::int(), vec![types::int()]),
        |args| {
            let total = args[0]
                .items()
                .unwrap_or_default()
                .iter()
                .filter_map(NativeValue::as_i64)
                .sum();
            Ok(vec![int(total)])
        },
    )
    .named("variadicIn");

    let dog_ty = REGISTRY.intern(
        struct_of(vec![
            Field::exported("Age", types::int()),
            Field::exported("Name", types::string()),
        ])
        .named("Dog"),
    );
    let foo_ty = REGISTRY.intern(
        struct_of(vec![
            Field::exported("Baz", types::float64()),
            Field::exported("Dog", dog_ty.clone()),
        ])
        .named("Foo"),
    );
    let dog = NativeFunction::new(FuncType::new(vec![foo_ty], vec![dog_ty.clone()]), move |args| {
        Ok(vec![args[0]
            .field("Dog")
            .cloned()
            .unwrap_or_else(|| NativeValue::zero(&dog_ty))])
    })
    .named("dog");

    let bytes_out = NativeFunction::new(FuncType::new(vec![], vec![types::bytes()]), |_| {
        Ok(vec![NativeValue::Bytes((1..=10).collect())])
    })
    .named("bytesOut");

    for (name, function) in [
        ("rjs_add", add()),
        ("rjs_getAdder", get_adder),
        ("rjs_do", apply),
        ("rjs_variadicIn", variadic_in),
        ("rjs_dog", dog),
        ("rjs_bytesOut", bytes_out),
    ] {
        global.set(name, wrap_as_host_function(function))?;
    }
    Ok(())
}

fn main() -> BridgeResult<()> {
    hostbridge::interop::init();
    register()?;
    let global = global();

    let sum = global.call("rjs_add", &[2.into(), 3.into()])?;
    println!("rjs_add(2, 3) = {}", sum.to_json());

    let adder = global.call("rjs_getAdder", &[])?;
    let applied = global.call("rjs_do", &[4.into(), 5.into(), adder])?;
    println!("rjs_do(4, 5, rjs_getAdder()) = {}", applied.to_json());

    let args: Vec<HostValue> = (1..=5).map(HostValue::from).collect();
    let total = global.call("rjs_variadicIn", &args)?;
    println!("rjs_variadicIn(1, 2, 3, 4, 5) = {}", total.to_json());

    let foo = HostValue::from_json(&serde_json::json!({"Baz": 1.5, "Dog": {"Age": 3, "Name": "rex"}}));
    let dog = global.call("rjs_dog", &[foo])?;
    println!("rjs_dog(foo) = {}", dog.to_json());

    let bytes = global.call("rjs_bytesOut", &[])?;
    println!("rjs_bytesOut() = {}", bytes.to_json());

    if let Err(err) = global.call("rjs_add", &[1.into()]) {
        println!("rjs_add(1) threw: {err}");
    }

    let stats = hostbridge::stats();
    println!(
        "{} calls, {} errors, {} bytes copied in bulk",
        stats.calls_made, stats.conversion_errors, stats.fast_path_bytes
    );
    Ok(())
}
