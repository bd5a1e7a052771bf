use std::fmt;

/// Kind of elementary stream selected from a top-level source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn specifier(&self) -> &'static str {
        match self {
            StreamKind::Video => "v",
            StreamKind::Audio => "a",
        }
    }
}

/// Label connecting filter stages.
///
/// `Source` refers to a top-level input (`[0:v]`, `[1:v]`, ...), `Named`
/// to the output of an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Source { index: usize, stream: StreamKind },
    Named(String),
}

impl Label {
    pub fn video(index: usize) -> Self {
        Label::Source { index, stream: StreamKind::Video }
    }

    pub fn audio(index: usize) -> Self {
        Label::Source { index, stream: StreamKind::Audio }
    }

    pub fn named<S: Into<String>>(name: S) -> Self {
        Label::Named(name.into())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Source { index, stream } => write!(f, "[{}:{}]", index, stream.specifier()),
            Label::Named(name) => write!(f, "[{}]", name),
        }
    }
}

/// Typed filter option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    /// Expression evaluated by the engine, e.g. `iw*0.5` or `rotw(a)`
    Expr(String),
    /// Bare keyword such as `none`
    Keyword(String),
    /// Free text such as a caption or a font path; quoted when rendered
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Expr(e) => write!(f, "{}", e),
            ParamValue::Keyword(k) => write!(f, "{}", k),
            ParamValue::Text(t) => f.write_str(&quote_text(t)),
        }
    }
}

/// Quote `text` for the option parser, then escape the result for the
/// graph parser, which unescapes once before options are split.
fn quote_text(text: &str) -> String {
    let quoted = format!("'{}'", text.replace('\'', "'\\''"));
    let mut escaped = String::with_capacity(quoted.len() * 2);
    for c in quoted.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One named filter with labeled inputs, a single labeled output and
/// ordered `key=value` options.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub name: String,
    pub inputs: Vec<Label>,
    pub output: Label,
    pub params: Vec<(String, ParamValue)>,
}

impl FilterStage {
    pub fn new<S: Into<String>>(name: S, output: &str) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            output: Label::named(output),
            params: Vec::new(),
        }
    }

    pub fn input(mut self, label: Label) -> Self {
        self.inputs.push(label);
        self
    }

    pub fn param<K: Into<String>>(mut self, key: K, value: ParamValue) -> Self {
        self.params.push((key.into(), value));
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "{}", input)?;
        }
        write!(f, "{}", self.name)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '=' } else { ':' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        write!(f, "{}", self.output)
    }
}

/// Join stages with the graph's stage separator.
pub fn render_graph(stages: &[FilterStage]) -> String {
    stages.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(";")
}
