//! The native-call surface `CALL_NAT` dispatches into: a name-keyed
//! registry of host functions the script can call but never define.

use std::collections::HashMap;
use std::io::Write;

use super::view::View;
use super::RuntimeError;

/// What a native function is given on each call: its arguments and the
/// host's configured output streams.
pub struct NativeContext<'a> {
    pub args: Vec<View>,
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

pub type NativeFn = Box<dyn Fn(&mut NativeContext) -> Result<(), RuntimeError> + Send + Sync>;

pub struct NativeRegistry {
    functions: HashMap<String, NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        let mut functions: HashMap<String, NativeFn> = HashMap::new();
        functions.insert("print".to_string(), Box::new(native_print));
        functions.insert("type".to_string(), Box::new(native_type));
        NativeRegistry { functions }
    }

    pub fn register(&mut self, name: &str, f: NativeFn) {
        self.functions.insert(name.to_string(), f);
    }

    pub fn call(&self, name: &str, ctx: &mut NativeContext) -> Result<(), RuntimeError> {
        match self.functions.get(name) {
            Some(f) => f(ctx),
            None => Err(RuntimeError::UnknownNative { name: name.to_string() }),
        }
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn native_print(ctx: &mut NativeContext) -> Result<(), RuntimeError> {
    let rendered: Vec<String> = ctx.args.iter().map(View::display).collect();
    let _ = writeln!(ctx.stdout, "{}", rendered.join(" "));
    Ok(())
}

fn native_type(ctx: &mut NativeContext) -> Result<(), RuntimeError> {
    let rendered: Vec<String> =
        ctx.args.iter().map(|v| format!("({})", v.tag.name())).collect();
    let _ = writeln!(ctx.stdout, "{}", rendered.join(" "));
    Ok(())
}
