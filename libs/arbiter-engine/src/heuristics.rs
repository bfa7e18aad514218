//! Source heuristics used by the fallback executor.
//!
//! None of this executes code. The well-formedness check only verifies that
//! delimiters, string literals and block comments close, using the comment
//! and quote rules of the submission's language. The classifiers look at
//! source text for structural hints. Both are tuned for common textbook
//! solutions and are not a substitute for a real backend.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plausibility {
    PlausibleCorrect,
    PlausibleIncorrect,
}

/// Pluggable structural judgement of a submitted solution
pub trait HeuristicClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, source_code: &str) -> Plausibility;
}

/// Pair-sum ("two sum") classifier.
///
/// A solution is plausible when it uses an associative lookup, iterates, and
/// computes a complement against the target. A solution whose only non-empty
/// answers are literal index pairs such as `return [0, 1]` is judged
/// incorrect whatever else it contains.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairSumClassifier;

const LOOKUP_HINTS: &[&str] = &["map", "dict", "hash", "{}", "lookup", "seen"];
const LOOP_HINTS: &[&str] = &["for", "while", "each", "iter"];
const COMPLEMENT_HINTS: &[&str] = &["complement", "target -", "target-", "diff", "need"];

impl HeuristicClassifier for PairSumClassifier {
    fn name(&self) -> &'static str {
        "pair-sum"
    }

    fn classify(&self, source_code: &str) -> Plausibility {
        let lowered = source_code.to_lowercase();
        let has = |hints: &[&str]| hints.iter().any(|h| lowered.contains(h));

        let has_lookup = has(LOOKUP_HINTS);
        let has_loop = has(LOOP_HINTS);
        let has_complement = has(COMPLEMENT_HINTS);
        let has_return = lowered.contains("return") || lowered.contains("print");

        let hardcoded = returns_only_literal_pairs(&lowered);

        if has_lookup && has_loop && has_complement && has_return && !hardcoded {
            Plausibility::PlausibleCorrect
        } else {
            Plausibility::PlausibleIncorrect
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReturnShape {
    /// `[]`, `null`, `-1` and friends
    Empty,
    /// A bracketed list of integer literals, e.g. `[0, 1]`
    LiteralPair,
    Computed,
}

fn return_shape(expr: &str) -> ReturnShape {
    let mut compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    // `return [0, 1]; }` on a one-line function
    loop {
        let dangling_brace = compact.ends_with('}')
            && compact.matches('}').count() > compact.matches('{').count();
        if compact.ends_with(';') || dangling_brace {
            compact.pop();
        } else {
            break;
        }
    }

    match compact.as_str() {
        "" | "[]" | "{}" | "()" | "null" | "none" | "nil" | "-1" | "vec![]" | "newint[0]" => {
            ReturnShape::Empty
        }
        _ => {
            let inner = compact
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .or_else(|| compact.strip_prefix('(').and_then(|s| s.strip_suffix(')')))
                .or_else(|| compact.strip_prefix("vec![").and_then(|s| s.strip_suffix(']')))
                .or_else(|| compact.strip_prefix("newint[]{").and_then(|s| s.strip_suffix('}')));
            match inner {
                Some(items)
                    if items.split(',').count() > 1
                        && items
                            .split(',')
                            .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())) =>
                {
                    ReturnShape::LiteralPair
                }
                _ => ReturnShape::Computed,
            }
        }
    }
}

/// True when some `return` hands back a literal index pair and no `return`
/// hands back anything computed
fn returns_only_literal_pairs(lowered: &str) -> bool {
    let shapes: Vec<ReturnShape> = lowered
        .lines()
        .filter_map(|line| {
            let at = line.find("return")?;
            let before = line[..at].chars().next_back();
            if before.is_some_and(|c| c.is_alphanumeric() || c == '_') {
                return None;
            }
            Some(return_shape(&line[at + "return".len()..]))
        })
        .collect();

    shapes.contains(&ReturnShape::LiteralPair) && !shapes.contains(&ReturnShape::Computed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {} (line {})", self.message, self.line)
    }
}

/// What a `#` outside a string means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashRule {
    /// Ordinary character (Rust attributes, Swift directives)
    Plain,
    /// Comment to end of line, except `$#` (Perl array length)
    Comment,
    /// Comment, except `#[` which opens a PHP attribute
    CommentUnlessAttribute,
    /// Preprocessor line when `#` is the first non-blank character
    Directive,
}

/// What a `'` outside a string means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteRule {
    /// `'...'` closing on the same line is a string; an unclosed quote is ignored
    Literal,
    /// Only one-character or escaped char literals; every other quote is a
    /// lifetime, loop label or prime
    CharLiteral,
    /// Never a string (Lisp quoting, Tcl)
    Ignore,
}

/// Lexical rules for one language family
#[derive(Debug, Clone, Copy)]
struct SyntaxProfile {
    line_comments: &'static [&'static str],
    /// (open, close, what an unterminated one is called)
    blocks: &'static [(&'static str, &'static str, &'static str)],
    hash: HashRule,
    quote: QuoteRule,
}

const C_BLOCK: (&str, &str, &str) = ("/*", "*/", "block comment");

const C_LIKE: SyntaxProfile = SyntaxProfile {
    line_comments: &["//"],
    blocks: &[C_BLOCK],
    hash: HashRule::Plain,
    quote: QuoteRule::Literal,
};

impl SyntaxProfile {
    /// `None` for languages whose source cannot be judged by bracket balance
    fn for_language(language_id: u32) -> Option<Self> {
        let profile = match language_id {
            // c, csharp, cpp17
            50 | 51 | 54 => SyntaxProfile {
                hash: HashRule::Directive,
                ..C_LIKE
            },
            // rust
            73 => SyntaxProfile {
                quote: QuoteRule::CharLiteral,
                ..C_LIKE
            },
            // php
            78 => SyntaxProfile {
                hash: HashRule::CommentUnlessAttribute,
                ..C_LIKE
            },
            // python3
            71 => SyntaxProfile {
                line_comments: &[],
                blocks: &[
                    ("\"\"\"", "\"\"\"", "string literal"),
                    ("'''", "'''", "string literal"),
                ],
                hash: HashRule::Comment,
                quote: QuoteRule::Literal,
            },
            // ruby
            79 => SyntaxProfile {
                line_comments: &[],
                blocks: &[("=begin", "=end", "block comment")],
                hash: HashRule::Comment,
                quote: QuoteRule::Literal,
            },
            // elixir, perl, r
            82 | 87 | 88 => SyntaxProfile {
                line_comments: &[],
                blocks: &[],
                hash: HashRule::Comment,
                quote: QuoteRule::Literal,
            },
            // powershell
            91 => SyntaxProfile {
                line_comments: &[],
                blocks: &[("<#", "#>", "block comment")],
                hash: HashRule::Comment,
                quote: QuoteRule::Literal,
            },
            // tcl
            98 => SyntaxProfile {
                line_comments: &[],
                blocks: &[],
                hash: HashRule::Comment,
                quote: QuoteRule::Ignore,
            },
            // haskell
            84 => SyntaxProfile {
                line_comments: &["--"],
                blocks: &[("{-", "-}", "block comment")],
                hash: HashRule::Plain,
                quote: QuoteRule::CharLiteral,
            },
            // lua
            86 => SyntaxProfile {
                line_comments: &["--"],
                blocks: &[("--[[", "]]", "block comment")],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // sql
            89 => SyntaxProfile {
                line_comments: &["--"],
                ..C_LIKE
            },
            // erlang
            83 => SyntaxProfile {
                line_comments: &["%"],
                blocks: &[],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // prolog
            95 => SyntaxProfile {
                line_comments: &["%"],
                ..C_LIKE
            },
            // clojure
            85 => SyntaxProfile {
                line_comments: &[";"],
                blocks: &[],
                hash: HashRule::Plain,
                quote: QuoteRule::Ignore,
            },
            // scheme
            96 => SyntaxProfile {
                line_comments: &[";"],
                blocks: &[("#|", "|#", "block comment")],
                hash: HashRule::Plain,
                quote: QuoteRule::Ignore,
            },
            // cobol
            92 => SyntaxProfile {
                line_comments: &["*>"],
                blocks: &[],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // fortran
            93 => SyntaxProfile {
                line_comments: &["!"],
                blocks: &[],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // pascal: braces are comments
            94 => SyntaxProfile {
                line_comments: &["//"],
                blocks: &[("{", "}", "block comment"), ("(*", "*)", "block comment")],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // smalltalk: double quotes are comments, which close like strings
            97 => SyntaxProfile {
                line_comments: &[],
                blocks: &[],
                hash: HashRule::Plain,
                quote: QuoteRule::Literal,
            },
            // bash case patterns leave `)` unpaired; whitespace and brainfuck
            // treat every other character as commentary
            90 | 99 | 100 => return None,
            // java, javascript, typescript, go, kotlin, swift, scala, dart
            _ => C_LIKE,
        };
        Some(profile)
    }
}

/// Well-formedness check using the lexical rules of `language_id`.
///
/// Brackets must balance and pair up, strings and block comments must
/// terminate. Comments, strings and char literals are skipped, so brackets
/// inside them never count. Languages without a usable bracket structure
/// always pass.
pub fn check_well_formed(source: &str, language_id: u32) -> Result<(), SyntaxIssue> {
    match SyntaxProfile::for_language(language_id) {
        Some(profile) => Scanner::new(source, profile).run(),
        None => Ok(()),
    }
}

struct Scanner {
    chars: Vec<char>,
    profile: SyntaxProfile,
    line: usize,
    i: usize,
}

impl Scanner {
    fn new(source: &str, profile: SyntaxProfile) -> Self {
        Self {
            chars: source.chars().collect(),
            profile,
            line: 1,
            i: 0,
        }
    }

    fn at(&self, marker: &str) -> bool {
        marker
            .chars()
            .enumerate()
            .all(|(k, m)| self.chars.get(self.i + k) == Some(&m))
    }

    fn prev(&self) -> Option<char> {
        self.i.checked_sub(1).map(|p| self.chars[p])
    }

    fn skip_to_eol(&mut self) {
        while self.i < self.chars.len() && self.chars[self.i] != '\n' {
            self.i += 1;
        }
    }

    fn hash_starts_comment(&self) -> bool {
        match self.profile.hash {
            HashRule::Plain => false,
            HashRule::Comment => self.prev() != Some('$'),
            HashRule::CommentUnlessAttribute => self.chars.get(self.i + 1) != Some(&'['),
            HashRule::Directive => self.chars[..self.i]
                .iter()
                .rev()
                .take_while(|&&c| c != '\n')
                .all(|c| c.is_whitespace()),
        }
    }

    fn run(mut self) -> Result<(), SyntaxIssue> {
        let mut stack: Vec<(char, usize)> = Vec::new();

        while self.i < self.chars.len() {
            let block = self
                .profile
                .blocks
                .iter()
                .find(|(open, _, _)| self.at(open))
                .copied();
            if let Some((open, close, what)) = block {
                self.skip_block(open, close, what)?;
                continue;
            }
            if self.profile.line_comments.iter().any(|m| self.at(m)) {
                self.skip_to_eol();
                continue;
            }

            let c = self.chars[self.i];
            match c {
                '\n' => self.line += 1,
                '#' if self.hash_starts_comment() => {
                    self.skip_to_eol();
                    continue;
                }
                '"' | '`' => self.skip_string(c)?,
                '\'' => self.skip_single_quote(),
                '(' | '[' | '{' => stack.push((c, self.line)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        Some((open, open_line)) => {
                            return Err(SyntaxIssue {
                                line: self.line,
                                message: format!(
                                    "unexpected '{}', '{}' opened on line {} is still open",
                                    c, open, open_line
                                ),
                            })
                        }
                        None => {
                            return Err(SyntaxIssue {
                                line: self.line,
                                message: format!("unexpected token '{}'", c),
                            })
                        }
                    }
                }
                _ => {}
            }
            self.i += 1;
        }

        match stack.pop() {
            Some((open, open_line)) => Err(SyntaxIssue {
                line: open_line,
                message: format!("unexpected end of input, '{}' never closed", open),
            }),
            None => Ok(()),
        }
    }

    /// Leaves `i` just past the closing marker
    fn skip_block(&mut self, open: &str, close: &str, what: &str) -> Result<(), SyntaxIssue> {
        let start = self.line;
        self.i += open.chars().count();
        loop {
            if self.i >= self.chars.len() {
                return Err(SyntaxIssue {
                    line: start,
                    message: format!("unterminated {}", what),
                });
            }
            if self.at(close) {
                self.i += close.chars().count();
                return Ok(());
            }
            if self.chars[self.i] == '\n' {
                self.line += 1;
            }
            self.i += 1;
        }
    }

    /// Leaves `i` on the closing delimiter
    fn skip_string(&mut self, delimiter: char) -> Result<(), SyntaxIssue> {
        let start = self.line;
        self.i += 1;
        loop {
            match self.chars.get(self.i) {
                None => {
                    return Err(SyntaxIssue {
                        line: start,
                        message: "unterminated string literal".to_string(),
                    })
                }
                Some('\\') => {
                    if self.chars.get(self.i + 1) == Some(&'\n') {
                        self.line += 1;
                    }
                    self.i += 1;
                }
                Some(&q) if q == delimiter => return Ok(()),
                Some('\n') => self.line += 1,
                Some(_) => {}
            }
            self.i += 1;
        }
    }

    /// Leaves `i` on the closing quote of a literal, or on the quote itself
    /// when it does not open one
    fn skip_single_quote(&mut self) {
        let end = match self.profile.quote {
            QuoteRule::Literal => self.same_line_close(),
            QuoteRule::CharLiteral => self.char_literal_close(),
            QuoteRule::Ignore => None,
        };
        if let Some(end) = end {
            self.i = end;
        }
    }

    fn same_line_close(&self) -> Option<usize> {
        let mut j = self.i + 1;
        while let Some(&c) = self.chars.get(j) {
            match c {
                '\\' => j += 1,
                '\'' => return Some(j),
                '\n' => return None,
                _ => {}
            }
            j += 1;
        }
        None
    }

    /// `'x'`, or an escape such as `'\n'` / `'\u{1F600}'`
    fn char_literal_close(&self) -> Option<usize> {
        match self.chars.get(self.i + 1) {
            Some('\\') => self.same_line_close(),
            Some(&c) if c != '\n' && self.chars.get(self.i + 2) == Some(&'\'') => Some(self.i + 2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JS_TWO_SUM: &str = r#"
function twoSum(nums, target) {
    const map = new Map();
    for (let i = 0; i < nums.length; i++) {
        const complement = target - nums[i];
        if (map.has(complement)) {
            return [map.get(complement), i];
        }
        map.set(nums[i], i);
    }
    return [];
}
"#;

    const JAVASCRIPT: u32 = 63;
    const PYTHON: u32 = 71;
    const RUST: u32 = 73;
    const C: u32 = 50;

    fn assert_well_formed(source: &str, language_id: u32) {
        if let Err(issue) = check_well_formed(source, language_id) {
            panic!("language {} rejected {:?}: {}", language_id, source, issue);
        }
    }

    #[test]
    fn test_classifier_accepts_hash_solution() {
        assert_eq!(PairSumClassifier.classify(JS_TWO_SUM), Plausibility::PlausibleCorrect);
    }

    #[test]
    fn test_classifier_accepts_python_dict_solution() {
        let source = r#"
def two_sum(nums, target):
    seen = {}
    for i, n in enumerate(nums):
        if target - n in seen:
            return [seen[target - n], i]
        seen[n] = i
"#;
        assert_eq!(PairSumClassifier.classify(source), Plausibility::PlausibleCorrect);
    }

    #[test]
    fn test_classifier_rejects_hardcoded_answer() {
        let source = "function twoSum(nums, target) { return [0, 1]; }";
        assert_eq!(PairSumClassifier.classify(source), Plausibility::PlausibleIncorrect);
    }

    #[test]
    fn test_classifier_rejects_hardcoded_answer_behind_decoys() {
        // Lookup, loop and complement are all present, but nothing computed is returned
        let source = r#"
function twoSum(nums, target) {
    const map = new Map();
    for (let i = 0; i < nums.length; i++) {
        const complement = target - nums[i];
        map.set(nums[i], i);
    }
    return [0, 1];
}
"#;
        assert_eq!(PairSumClassifier.classify(source), Plausibility::PlausibleIncorrect);
    }

    #[test]
    fn test_classifier_allows_literal_fallback_next_to_computed_answer() {
        let source = r#"
def two_sum(nums, target):
    seen = {}
    for i, n in enumerate(nums):
        complement = target - n
        if complement in seen:
            return [seen[complement], i]
        seen[n] = i
    return [0, 1]
"#;
        assert_eq!(PairSumClassifier.classify(source), Plausibility::PlausibleCorrect);
    }

    #[test]
    fn test_return_shapes() {
        assert_eq!(return_shape(" [0, 1];"), ReturnShape::LiteralPair);
        assert_eq!(return_shape("new int[] {0, 1};"), ReturnShape::LiteralPair);
        assert_eq!(return_shape("(0, 1)"), ReturnShape::LiteralPair);
        assert_eq!(return_shape("[];"), ReturnShape::Empty);
        assert_eq!(return_shape(" [0, 1]; }"), ReturnShape::LiteralPair);
        assert_eq!(return_shape("none"), ReturnShape::Empty);
        assert_eq!(return_shape("[map.get(complement), i];"), ReturnShape::Computed);
        assert_eq!(return_shape("[0]"), ReturnShape::Computed);
    }

    #[test]
    fn test_classifier_rejects_missing_complement() {
        let source = "function f(nums) { const m = new Map(); for (const n of nums) {} return []; }";
        assert_eq!(PairSumClassifier.classify(source), Plausibility::PlausibleIncorrect);
    }

    #[test]
    fn test_well_formed_sources() {
        assert_well_formed(JS_TWO_SUM, JAVASCRIPT);
        assert_well_formed("print('(')", PYTHON);
        assert_well_formed("x = 1  # unbalanced ( in comment\nprint(x)", PYTHON);
        assert_well_formed("/* ) */ int main() { return 0; }", C);
        assert_well_formed("#include <stdio.h>\nint main() { printf(\"}\"); }", C);
    }

    #[test]
    fn test_single_quoted_strings_hide_brackets() {
        assert_well_formed(
            "console.log('Indices: [' + [a, b].join(',') + ']');",
            JAVASCRIPT,
        );
        assert_well_formed(
            "print('pair: (' + str(seen[complement]) + ', ' + str(i) + ')')",
            PYTHON,
        );
        assert_well_formed("$s = 'open { here';\necho $s;", 78);
        assert_well_formed("SELECT '(' AS paren FROM t WHERE (a = 1);", 89);
    }

    #[test]
    fn test_unclosed_single_quote_is_ignored() {
        assert_well_formed("val sym = 'foo\nprintln(sym)", 80);
    }

    #[test]
    fn test_rust_quotes() {
        assert_well_formed("fn f<'a>(x: &'a str) -> &'a str { x }", RUST);
        assert_well_formed("let open = '('; 'outer: loop { break 'outer; }", RUST);
        assert_well_formed("let b = b'['; let e = '\\u{1F600}'; let q = '\\'';", RUST);
        assert_well_formed("fn g<'a, 'b>(x: &'a [u8], y: &'b [u8]) {}", RUST);
    }

    #[test]
    fn test_hash_is_not_a_comment_everywhere() {
        assert_well_formed("#[derive(Debug)] struct X {\n    a: u8,\n}", RUST);
        assert_well_formed("#[Attribute]\nfunction f() { return 1; } # note (", 78);
        assert_well_formed("my @a = (1, 2);\nmy $n = $#a; # last index (\n", 87);
        assert_well_formed("  #region Setup\nclass A { }\n  #endregion", 51);

        assert_well_formed("#define OPEN (\nint main() { return 0; }", 54);
        // Mid-line `#` in C++ is not a comment, so the paren after it still counts
        let issue = check_well_formed("int a = (1 # 2;", 54).unwrap_err();
        assert!(issue.message.contains("'(' never closed"));
    }

    #[test]
    fn test_python_floor_division_and_docstrings() {
        assert_well_formed("mid = (lo + hi) // 2\nprint(mid)", PYTHON);
        assert_well_formed("def f():\n    \"\"\"Returns (a, b\n    \"\"\"\n    return 1", PYTHON);
        assert_well_formed("s = '''it's [\nok'''", PYTHON);

        let issue = check_well_formed("def f():\n    \"\"\"never closed", PYTHON).unwrap_err();
        assert!(issue.message.contains("unterminated string literal"));
    }

    #[test]
    fn test_other_comment_styles() {
        assert_well_formed("foldl' (+) 0 xs -- sum (\nisOpen c = c == '('", 84);
        assert_well_formed("--[[ ( ]] print(1) -- )", 86);
        assert_well_formed("(def xs '(1 2 3)) ; unbalanced (", 85);
        assert_well_formed("begin { ( comment } writeln('('); (* ) *) end.", 94);
        assert_well_formed("main() -> io:format(\"~p~n\", [1]). % (", 83);
    }

    #[test]
    fn test_unjudgeable_languages_pass() {
        assert_well_formed("case $x in\n  a) echo a;;\nesac", 90);
        assert_well_formed("+[>+<-]] this is a comment (", 100);
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let issue = check_well_formed("function f() {\n  return 1;\n", JAVASCRIPT).unwrap_err();
        assert_eq!(issue.line, 1);
        assert!(issue.to_string().starts_with("SyntaxError: unexpected end of input"));

        let issue = check_well_formed("print('a' + (1", PYTHON).unwrap_err();
        assert!(issue.message.contains("'(' never closed"));
    }

    #[test]
    fn test_mismatched_closer() {
        let issue = check_well_formed("foo(1, 2]\n", JAVASCRIPT).unwrap_err();
        assert!(issue.message.contains("unexpected ']'"));
    }

    #[test]
    fn test_stray_closer() {
        let issue = check_well_formed("x = 1\n)", PYTHON).unwrap_err();
        assert_eq!(issue.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let issue = check_well_formed("console.log(\"hi);\n", JAVASCRIPT).unwrap_err();
        assert!(issue.message.contains("unterminated string"));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let issue = check_well_formed("int x; /* open\n", C).unwrap_err();
        assert_eq!(issue.message, "unterminated block comment");
    }
}
