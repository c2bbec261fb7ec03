use std::collections::HashMap;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

type Result<T> = std::result::Result<T, VmError>;

#[derive(Debug)]
pub enum VmError {
    InvalidLine(u32, &'static str),
    IO(io::Error),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VmError::InvalidLine(ref l, ref s) => write!(f, "invalid vm line {}: {}", l, s),
            VmError::IO(ref e) => e.fmt(f),
        }
    }
}

impl error::Error for VmError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            VmError::InvalidLine(_, _) => None,
            VmError::IO(ref e) => Some(e),
        }
    }
}

impl From<io::Error> for VmError {
    fn from(err: io::Error) -> VmError {
        VmError::IO(err)
    }
}

/// A named storage region of the stack machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    fn from_name(s: &str) -> Option<Segment> {
        match s {
            "constant" => Some(Segment::Constant),
            "argument" => Some(Segment::Argument),
            "local" => Some(Segment::Local),
            "static" => Some(Segment::Static),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "pointer" => Some(Segment::Pointer),
            "temp" => Some(Segment::Temp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    fn from_name(s: &str) -> Option<ArithmeticOp> {
        match s {
            "add" => Some(ArithmeticOp::Add),
            "sub" => Some(ArithmeticOp::Sub),
            "neg" => Some(ArithmeticOp::Neg),
            "eq" => Some(ArithmeticOp::Eq),
            "gt" => Some(ArithmeticOp::Gt),
            "lt" => Some(ArithmeticOp::Lt),
            "and" => Some(ArithmeticOp::And),
            "or" => Some(ArithmeticOp::Or),
            "not" => Some(ArithmeticOp::Not),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One stack machine instruction. Rendered with `Display`, one per line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Push(seg, i) => write!(f, "push {} {}", seg, i),
            Command::Pop(seg, i) => write!(f, "pop {} {}", seg, i),
            Command::Arithmetic(op) => write!(f, "{}", op),
            Command::Label(l) => write!(f, "label {}", l.to_uppercase()),
            Command::Goto(l) => write!(f, "goto {}", l),
            Command::IfGoto(l) => write!(f, "if-goto {}", l),
            Command::Call(name, n) => write!(f, "call {} {}", name, n),
            Command::Function(name, n) => write!(f, "function {} {}", name, n),
            Command::Return => write!(f, "return"),
        }
    }
}

pub struct Program(pub Vec<Command>);

impl Program {
    /// Iterates over the `function` headers in program order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, u16)> {
        self.0.iter().filter_map(|c| match c {
            Command::Function(name, n) => Some((name.as_str(), *n)),
            _ => None,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for cmd in &self.0 {
            writeln!(f, "{}", cmd)?
        }
        Ok(())
    }
}

pub fn parse_file(p: &Path) -> Result<Program> {
    let file = File::open(p)?;
    parse_reader(BufReader::new(file))
}

pub fn parse_str(s: &str) -> Result<Program> {
    parse_reader(s.as_bytes())
}

fn parse_reader<R: BufRead>(reader: R) -> Result<Program> {
    let mut commands = Vec::new();

    for (i, l) in reader.lines().enumerate() {
        let raw_line = l?;
        let line = match raw_line.find("//") {
            Some(at) => &raw_line[..at],
            None => &raw_line[..],
        };

        match parse_line(line.trim()) {
            Ok(Some(cmd)) => commands.push(cmd),
            Ok(None) => {}
            Err(msg) => return Err(VmError::InvalidLine(i as u32 + 1, msg)),
        }
    }

    Ok(Program(commands))
}

fn parse_line(line: &str) -> std::result::Result<Option<Command>, &'static str> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let cmd = match parts.as_slice() {
        [] => return Ok(None),
        ["return"] => Command::Return,
        ["push", seg, i] => Command::Push(parse_segment(seg)?, parse_index(i)?),
        ["pop", seg, i] => {
            let seg = parse_segment(seg)?;
            if seg == Segment::Constant {
                return Err("cannot pop into constant segment");
            }
            Command::Pop(seg, parse_index(i)?)
        }
        ["label", l] => Command::Label(l.to_string()),
        ["goto", l] => Command::Goto(l.to_string()),
        ["if-goto", l] => Command::IfGoto(l.to_string()),
        ["call", name, n] => Command::Call(name.to_string(), parse_index(n)?),
        ["function", name, n] => Command::Function(name.to_string(), parse_index(n)?),
        [op] => match ArithmeticOp::from_name(op) {
            Some(op) => Command::Arithmetic(op),
            None => return Err("unknown command"),
        },
        _ => return Err("wrong number of operands"),
    };

    Ok(Some(cmd))
}

fn parse_segment(s: &str) -> std::result::Result<Segment, &'static str> {
    Segment::from_name(s).ok_or("unknown segment")
}

fn parse_index(s: &str) -> std::result::Result<u16, &'static str> {
    s.parse::<u16>().map_err(|_| "invalid index")
}

/// Writes commands to an output stream in VM text format.
///
/// The writer also owns the label counters for one compilation run so
/// generated labels never collide within the output it produces.
pub struct VmWriter<W: Write> {
    out: W,
    label_counters: HashMap<String, usize>,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        VmWriter {
            out,
            label_counters: HashMap::new(),
        }
    }

    pub fn write(&mut self, cmd: &Command) -> io::Result<()> {
        writeln!(self.out, "{}", cmd)
    }

    pub fn write_push(&mut self, seg: Segment, index: u16) -> io::Result<()> {
        self.write(&Command::Push(seg, index))
    }

    pub fn write_pop(&mut self, seg: Segment, index: u16) -> io::Result<()> {
        self.write(&Command::Pop(seg, index))
    }

    pub fn write_arithmetic(&mut self, op: ArithmeticOp) -> io::Result<()> {
        self.write(&Command::Arithmetic(op))
    }

    pub fn write_label(&mut self, label: &str) -> io::Result<()> {
        self.write(&Command::Label(label.to_owned()))
    }

    pub fn write_goto(&mut self, label: &str) -> io::Result<()> {
        self.write(&Command::Goto(label.to_owned()))
    }

    pub fn write_if(&mut self, label: &str) -> io::Result<()> {
        self.write(&Command::IfGoto(label.to_owned()))
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) -> io::Result<()> {
        self.write(&Command::Call(name.to_owned(), n_args))
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) -> io::Result<()> {
        self.write(&Command::Function(name.to_owned(), n_locals))
    }

    pub fn write_return(&mut self) -> io::Result<()> {
        self.write(&Command::Return)
    }

    /// Returns the next label for `prefix`, e.g. `WHILE_END3`. Each prefix
    /// counts independently from zero. Labels are already uppercase so
    /// `goto` references match the normalized `label` directive.
    pub fn new_label(&mut self, prefix: &str) -> String {
        let counter = self.label_counters.entry(prefix.to_owned()).or_insert(0);
        let label = format!("{}{}", prefix.to_uppercase(), counter);
        *counter += 1;
        label
    }

    /// Flushes and hands back the underlying stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_display {
        ($func:ident, $cmd:expr, $expected:expr) => {
            #[test]
            fn $func() {
                assert_eq!($cmd.to_string(), $expected);
            }
        };
    }

    test_display!(
        display_push,
        Command::Push(Segment::Constant, 7),
        "push constant 7"
    );
    test_display!(display_pop, Command::Pop(Segment::That, 0), "pop that 0");
    test_display!(
        display_arith,
        Command::Arithmetic(ArithmeticOp::Not),
        "not"
    );
    test_display!(
        display_label_uppercased,
        Command::Label("loop_start".to_owned()),
        "label LOOP_START"
    );
    test_display!(
        display_goto_verbatim,
        Command::Goto("WHILE_EXP0".to_owned()),
        "goto WHILE_EXP0"
    );
    test_display!(
        display_if_goto,
        Command::IfGoto("IF_ELSE1".to_owned()),
        "if-goto IF_ELSE1"
    );
    test_display!(
        display_call,
        Command::Call("Math.multiply".to_owned(), 2),
        "call Math.multiply 2"
    );
    test_display!(
        display_function,
        Command::Function("Main.main".to_owned(), 3),
        "function Main.main 3"
    );
    test_display!(display_return, Command::Return, "return");

    #[test]
    fn test_new_label_counts_per_prefix() {
        let mut w = VmWriter::new(Vec::<u8>::new());

        assert_eq!(w.new_label("IF_ELSE"), "IF_ELSE0");
        assert_eq!(w.new_label("IF_ELSE"), "IF_ELSE1");
        assert_eq!(w.new_label("WHILE_EXP"), "WHILE_EXP0");
        assert_eq!(w.new_label("while_end"), "WHILE_END0");
        assert_eq!(w.new_label("IF_ELSE"), "IF_ELSE2");
    }

    #[test]
    fn test_writer_output() {
        let mut w = VmWriter::new(Vec::<u8>::new());
        w.write_function("Main.main", 0).unwrap();
        w.write_push(Segment::Constant, 1).unwrap();
        w.write_arithmetic(ArithmeticOp::Neg).unwrap();
        w.write_label("end").unwrap();
        w.write_goto("END").unwrap();
        w.write_return().unwrap();

        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "function Main.main 0\npush constant 1\nneg\nlabel END\ngoto END\nreturn\n"
        );
    }

    #[test]
    fn test_parse_program() {
        let src = "// header\nfunction Foo.bar 2\n\n  push argument 0 // receiver\npop pointer 0\nif-goto IF_ELSE0\ncall Math.divide 2\nreturn\n";
        let prog = parse_str(src).unwrap();

        assert_eq!(
            prog.0,
            vec![
                Command::Function("Foo.bar".to_owned(), 2),
                Command::Push(Segment::Argument, 0),
                Command::Pop(Segment::Pointer, 0),
                Command::IfGoto("IF_ELSE0".to_owned()),
                Command::Call("Math.divide".to_owned(), 2),
                Command::Return,
            ]
        );
        assert_eq!(prog.functions().collect::<Vec<_>>(), vec![("Foo.bar", 2)]);
    }

    #[test]
    fn test_program_display_is_canonical() {
        let src = "push constant 3\nlt\nlabel WHILE_END0\n";
        let prog = parse_str(src).unwrap();
        assert_eq!(prog.to_string(), src);
    }

    #[test]
    fn test_parse_file() {
        let path = std::env::temp_dir().join(format!("vm_writer_{}.vm", std::process::id()));
        std::fs::write(&path, "function Main.main 0\r\npush constant 0\r\nreturn\r\n").unwrap();

        let prog = parse_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            prog.unwrap().0,
            vec![
                Command::Function("Main.main".to_owned(), 0),
                Command::Push(Segment::Constant, 0),
                Command::Return,
            ]
        );
    }

    #[test]
    fn test_parse_missing_file() {
        let path = std::env::temp_dir().join("vm_writer_missing").join("none.vm");
        match parse_file(&path) {
            Err(VmError::IO(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            _ => panic!("expected an io error"),
        }
    }

    #[test]
    fn test_parse_errors() {
        match parse_str("push constant 1\npush heap 2\n") {
            Err(VmError::InvalidLine(2, msg)) => assert_eq!(msg, "unknown segment"),
            _ => panic!("expected invalid segment"),
        }
        match parse_str("pop constant 0") {
            Err(VmError::InvalidLine(1, _)) => {}
            _ => panic!("expected constant pop rejection"),
        }
        match parse_str("push local -1") {
            Err(VmError::InvalidLine(1, msg)) => assert_eq!(msg, "invalid index"),
            _ => panic!("expected invalid index"),
        }
        match parse_str("jump somewhere") {
            Err(VmError::InvalidLine(1, msg)) => assert_eq!(msg, "wrong number of operands"),
            _ => panic!("expected operand count error"),
        }
    }
}
