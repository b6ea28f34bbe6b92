// src/bundle/commonjs.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::debug;

use crate::bundle::resolve::Resolver;
use crate::bundle::source_map::SourceMapBuilder;
use crate::bundle::{BundleFailure, BundleOutput, BundleRequest, ScriptBundler};
use crate::errors::CompileError;
use crate::fs::FileSystem;

static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^.\w$])require\s*\(\s*(?:'([^'\n]*)'|"([^"\n]*)")\s*\)"#)
        .unwrap_or_else(|e| panic!("require pattern is valid: {e}"))
});

/// Runtime loader placed at the top of every bundle. Takes the module table,
/// a cache object and the list of entry ids.
const PRELUDE: &str = r#"(function (modules, cache, entries) {
  function load(id) {
    if (!cache[id]) {
      if (!modules[id]) {
        var err = new Error("Cannot find module '" + id + "'");
        err.code = "MODULE_NOT_FOUND";
        throw err;
      }
      var module = (cache[id] = { exports: {} });
      modules[id][0].call(
        module.exports,
        function (request) {
          var dep = modules[id][1][request];
          return load(dep ? dep : request);
        },
        module,
        module.exports
      );
    }
    return cache[id].exports;
  }
  for (var i = 0; i < entries.length; i++) load(entries[i]);
  return load;
})
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleKind {
    Script,
    Json,
}

#[derive(Debug)]
struct Module {
    id: usize,
    path: PathBuf,
    source: String,
    kind: ModuleKind,
    /// Request string → module id, as seen by the runtime `require`.
    deps: BTreeMap<String, usize>,
}

/// Browserify-style CommonJS bundler.
///
/// Modules are discovered breadth-first from the entry and numbered from 1
/// in discovery order, so the same inputs always produce the same bundle.
/// Requests are found by scanning for `require('<literal>')`; dynamic
/// requires are left to fail at runtime.
#[derive(Debug, Default, Clone)]
pub struct CommonJsBundler;

impl CommonJsBundler {
    pub fn new() -> Self {
        Self
    }
}

/// Literal `require` requests in source order, without duplicates.
///
/// Calls inside comments, string literals, template literals and regular
/// expression literals are ignored.
pub fn scan_requires(source: &str) -> Vec<String> {
    let code = code_only(source);
    let mut seen = BTreeSet::new();
    let mut requests = Vec::new();

    for caps in REQUIRE_CALL.captures_iter(&code) {
        let Some(m) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        // Offsets are shared with `source`; the literal itself was blanked.
        let Some(request) = source.get(m.start()..m.end()) else {
            continue;
        };
        if request.contains('\\') {
            continue;
        }
        if seen.insert(request.to_string()) {
            requests.push(request.to_string());
        }
    }

    requests
}

/// Copy of `source` with comments and the contents of string, template and
/// regex literals replaced by spaces. Quotes, newlines and byte offsets are
/// preserved.
fn code_only(source: &str) -> Vec<u8> {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    // Last non-whitespace code byte; decides whether `/` starts a regex.
    let mut prev: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'/')) => {
                let end = find_from(bytes, i, b"\n").unwrap_or(bytes.len());
                blank(&mut out, i, end);
                i = end;
            }
            (b'/', Some(b'*')) => {
                let end = find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
                blank(&mut out, i, end);
                i = end;
            }
            (quote @ (b'\'' | b'"' | b'`'), _) => {
                let end = literal_end(bytes, i, quote);
                blank(&mut out, i + 1, end);
                i = if bytes.get(end) == Some(&quote) { end + 1 } else { end };
                prev = Some(quote);
            }
            (b'/', _) if starts_regex(prev) => {
                let end = regex_end(bytes, i);
                blank(&mut out, i + 1, end);
                i = if bytes.get(end) == Some(&b'/') { end + 1 } else { end };
                prev = Some(b'/');
            }
            (b, _) => {
                if !b.is_ascii_whitespace() {
                    prev = Some(b);
                }
                i += 1;
            }
        }
    }

    out
}

fn find_from(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    for b in out.iter_mut().take(end).skip(start) {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Index of the closing `quote`, or of the newline/end that cuts off an
/// unterminated quoted string.
fn literal_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return j,
            b'\n' if quote != b'`' => return j,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// A `/` after an operator or opening bracket begins a regex literal rather
/// than a division.
fn starts_regex(prev: Option<u8>) -> bool {
    prev.is_none_or(|c| b"(,=:[!&|?{};+-*%<>~^".contains(&c))
}

fn regex_end(bytes: &[u8], start: usize) -> usize {
    let mut in_class = false;
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            b']' if in_class => {
                in_class = false;
                j += 1;
            }
            b'[' => {
                in_class = true;
                j += 1;
            }
            b'/' if !in_class => return j,
            _ => j += 1,
        }
    }
    bytes.len()
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn script_error(path: &Path, message: impl Into<String>) -> CompileError {
    CompileError::Script {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

impl ScriptBundler for CommonJsBundler {
    fn bundle(
        &self,
        fs: &dyn FileSystem,
        request: &BundleRequest<'_>,
    ) -> Result<BundleOutput, BundleFailure> {
        let resolver = Resolver::new(fs, &request.options.extensions);
        let mut dependencies: BTreeSet<PathBuf> = BTreeSet::new();

        let fail = |error: CompileError, mut deps: BTreeSet<PathBuf>| {
            deps.extend(resolver.take_consulted());
            BundleFailure {
                error,
                dependencies: deps,
            }
        };

        let entry = request.entry.to_path_buf();
        if !fs.is_file(&entry) {
            dependencies.insert(entry.clone());
            return Err(fail(
                script_error(&entry, "entry file not found"),
                dependencies,
            ));
        }

        let mut ids: HashMap<PathBuf, usize> = HashMap::from([(entry.clone(), 1)]);
        let mut queue: VecDeque<PathBuf> = VecDeque::from([entry.clone()]);
        let mut modules: Vec<Module> = Vec::new();

        while let Some(path) = queue.pop_front() {
            dependencies.insert(path.clone());

            let source = match fs.read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    return Err(fail(
                        script_error(&path, format!("cannot read module: {e:#}")),
                        dependencies,
                    ));
                }
            };

            let kind = if is_json(&path) {
                if let Err(e) = serde_json::from_str::<serde_json::Value>(&source) {
                    return Err(fail(
                        script_error(&path, format!("invalid JSON module: {e}")),
                        dependencies,
                    ));
                }
                ModuleKind::Json
            } else {
                ModuleKind::Script
            };

            let mut deps = BTreeMap::new();
            if kind == ModuleKind::Script {
                for req in scan_requires(&source) {
                    let Some(target) = resolver.resolve(&path, &req) else {
                        return Err(fail(
                            script_error(&path, format!("Cannot find module '{req}'")),
                            dependencies,
                        ));
                    };
                    let next_id = ids.len() + 1;
                    let id = *ids.entry(target.clone()).or_insert_with(|| {
                        queue.push_back(target);
                        next_id
                    });
                    deps.insert(req, id);
                }
            }

            let id = ids.get(&path).copied().unwrap_or(modules.len() + 1);
            modules.push(Module {
                id,
                path,
                source,
                kind,
                deps,
            });
        }

        dependencies.extend(resolver.take_consulted());
        debug!(
            entry = ?entry,
            modules = modules.len(),
            files = dependencies.len(),
            "resolved module graph"
        );

        let (code, map) = render(request, &modules);
        let source_map = match map {
            Some(map) => match serde_json::to_string(&map) {
                Ok(json) => Some(json),
                Err(e) => {
                    return Err(fail(
                        script_error(&entry, format!("cannot serialize source map: {e}")),
                        dependencies,
                    ));
                }
            },
            None => None,
        };

        Ok(BundleOutput {
            code,
            source_map,
            dependencies,
        })
    }
}

fn render(
    request: &BundleRequest<'_>,
    modules: &[Module],
) -> (String, Option<crate::bundle::source_map::SourceMap>) {
    let mut out = String::from(PRELUDE);
    let mut line = PRELUDE.lines().count();
    let mut map = SourceMapBuilder::new();

    out.push_str("({\n");
    line += 1;

    for (idx, module) in modules.iter().enumerate() {
        out.push_str(&format!("{}:[function(require,module,exports){{\n", module.id));
        line += 1;

        let body = match module.kind {
            ModuleKind::Script => module.source.clone(),
            ModuleKind::Json => format!("module.exports = {};", module.source.trim()),
        };
        let source_idx = map.add_source(display_path(request.root, &module.path), &module.source);
        for (original_line, text) in body.lines().enumerate() {
            out.push_str(text);
            out.push('\n');
            map.map_line(line, source_idx, original_line);
            line += 1;
        }

        let deps = serde_json::to_string(&module.deps).unwrap_or_else(|_| "{}".to_string());
        let separator = if idx + 1 == modules.len() { "" } else { "," };
        out.push_str(&format!("}},{deps}]{separator}\n"));
        line += 1;
    }

    let entry_id = modules.first().map(|m| m.id).unwrap_or(1);
    out.push_str(&format!("}},{{}},[{entry_id}]);\n"));

    if request.options.source_maps {
        out.push_str(&format!("//# sourceMappingURL={}.map\n", request.output_name));
        (out, Some(map.build(request.output_name)))
    } else {
        (out, None)
    }
}
