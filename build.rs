fn cfg(name: &str) -> String {
    std::env::var(format!("CARGO_CFG_{}", name.to_uppercase())).unwrap_or_default()
}

fn make_overridable_cfg(name: &str, logic: impl FnOnce() -> &'static str) -> String {
    let env_name = format!("LEAVETRAP_{}", name.to_uppercase());
    println!("cargo::rerun-if-env-changed={env_name}");
    let value = std::env::var(env_name).unwrap_or_else(|_| logic().to_string());
    println!("cargo::rustc-cfg={name}=\"{value}\"");
    value
}

fn main() {
    // The unwind backend rides the host unwinder, so it is only usable when
    // the crate is compiled with `panic = "unwind"`. Everything else degrades
    // to the non-recoverable abort backend.
    make_overridable_cfg("backend", || {
        if cfg("panic") == "abort" {
            "abort"
        } else {
            "unwind"
        }
    });
}
