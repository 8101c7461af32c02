fn main() {
    // `__builtin___clear_cache` has no stable libcore equivalent, so on POSIX we
    // reach it through a one-line C shim compiled by the platform's own compiler.
    if std::env::var("CARGO_CFG_UNIX").is_ok() {
        cc::Build::new()
            .file("src/platform/clear_cache.c")
            .compile("inline_hook_clear_cache");
    }
}
