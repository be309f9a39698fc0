//! Compiler argument surgery.
//!
//! Both the probe invocation and the stored invocation are derived from the
//! original argument list with these helpers. They never look at argument
//! semantics beyond the flag spelling and a fixed arity.

/// A flag to strip: its spelling, how many arguments it spans in the
/// separated form, and whether joined spellings (`-Ipath`) also match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    pub key: &'static str,
    pub arity: usize,
    pub prefix: bool,
}

impl FlagSpec {
    pub const fn exact(key: &'static str, arity: usize) -> Self {
        Self {
            key,
            arity,
            prefix: false,
        }
    }

    pub const fn prefixed(key: &'static str, arity: usize) -> Self {
        Self {
            key,
            arity,
            prefix: true,
        }
    }
}

/// Dependency-generation flags, stripped from both the probe and the
/// rewritten invocation.
pub const DEPENDENCY_FLAGS: &[FlagSpec] = &[
    FlagSpec::exact("-M", 1),
    FlagSpec::exact("-MD", 1),
    FlagSpec::exact("-MM", 1),
    FlagSpec::exact("-MMD", 1),
    FlagSpec::prefixed("-MF", 2),
];

/// Flags dropped before running a preprocessing probe.
pub const PROBE_STRIPPED_FLAGS: &[FlagSpec] = &[
    FlagSpec::exact("-c", 1),
    FlagSpec::exact("-M", 1),
    FlagSpec::exact("-MD", 1),
    FlagSpec::exact("-MM", 1),
    FlagSpec::exact("-MMD", 1),
    FlagSpec::prefixed("-o", 2),
    FlagSpec::prefixed("-MF", 2),
];

/// Flags that influence the include search path. Removed when the probe
/// resolved an explicit search list, which is then pinned with `-nostdinc`.
pub const INCLUDE_PATH_FLAGS: &[FlagSpec] = &[
    FlagSpec::prefixed("-I", 2),
    FlagSpec::exact("--include-directory", 2),
    FlagSpec::prefixed("--include-directory=", 1),
    FlagSpec::prefixed("-cxx-isystem", 2),
    FlagSpec::exact("-ibuiltininc", 1),
    FlagSpec::prefixed("-iframework", 2),
    FlagSpec::prefixed("-iframeworkwithsysroot", 2),
    FlagSpec::prefixed("--stdlib++-isystem", 2),
    FlagSpec::prefixed("-isystem", 2),
];

/// Remove every occurrence of `key` from `arguments`.
///
/// An exact match drops the flag and the `arity - 1` arguments after it. With
/// `prefix` set, an argument that merely starts with `key` is the joined form
/// (`-ofoo`, `-I/usr/include`) and drops only itself. Everything else is kept
/// in its original order.
pub fn remove_arg(arguments: &[String], key: &str, arity: usize, prefix: bool) -> Vec<String> {
    let mut result = Vec::with_capacity(arguments.len());
    let mut i = 0;
    while i < arguments.len() {
        let arg = &arguments[i];
        if arg == key {
            i += arity.max(1);
        } else if prefix && arg.starts_with(key) {
            i += 1;
        } else {
            result.push(arg.clone());
            i += 1;
        }
    }
    result
}

/// Apply [`remove_arg`] for each spec in turn.
pub fn remove_flags(arguments: &[String], specs: &[FlagSpec]) -> Vec<String> {
    specs.iter().fold(arguments.to_vec(), |acc, spec| {
        remove_arg(&acc, spec.key, spec.arity, spec.prefix)
    })
}

/// Insert `inserted` right after the compiler executable.
///
/// An empty argument list gets `inserted` as its whole tail; there is no
/// executable to keep in front.
pub fn splice_after_compiler<I, S>(arguments: &mut Vec<String>, inserted: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let at = arguments.len().min(1);
    let tail = arguments.split_off(at);
    arguments.extend(inserted.into_iter().map(Into::into));
    arguments.extend(tail);
}
