/// Splits an argument string the way a user would type it in a shortcut's
/// "arguments" box. Whitespace separates arguments unless quoted; a quoted
/// section ends at the same quote character that opened it.
pub fn split_args(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut started = false;
    let mut chars = args.chars();

    while let Some(ch) = chars.next() {
        match (ch, quote) {
            ('\'' | '"', None) => {
                quote = Some(ch);
                started = true;
            }
            (c, Some(q)) if c == q => quote = None,
            ('\\', Some('"')) => match chars.next() {
                Some('n') => current.push('\n'),
                Some('t') => current.push('\t'),
                Some(next @ ('\\' | '"')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (' ' | '\t', None) => {
                if started {
                    parts.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            (c, _) => {
                current.push(c);
                started = true;
            }
        }
    }

    if started {
        parts.push(current);
    }
    parts
}

/// Joins a program and its argument string into one line for a shell.
pub fn shell_line(program: &str, args: &str) -> String {
    let args = args.trim();
    if args.is_empty() { program.to_string() } else { format!("{program} {args}") }
}
