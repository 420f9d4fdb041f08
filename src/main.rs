use anyhow::{Context, Result};
use wasmini::Value;
use wasmini::execution::runtime::Runtime;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: wasmini <module.wasm> [export [i32 args...]]")?;
    let wasm = std::fs::read(&path).with_context(|| format!("failed to read {}", path))?;

    let mut runtime = Runtime::instantiate(&wasm)?;
    runtime.run_start()?;

    if let Some(name) = args.next() {
        let params = args
            .map(|arg| Ok(Value::I32(arg.parse()?)))
            .collect::<Result<Vec<_>>>()?;
        if let Some(value) = runtime.call(name, params)? {
            println!("{}", i32::from(value));
        }
    }

    Ok(())
}
