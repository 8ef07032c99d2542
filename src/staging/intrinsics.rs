//! Native functions available to staged code.
//!
//! Every [`Intrinsic`] is declared in the global scope of a new
//! [`crate::program::Program`] as a builtin [`FunctionSymbol`], so front ends bind
//! calls to them like calls to any other function. At build time the backend
//! dispatches those calls to [`Intrinsic::invoke`].
//!
//! | Intrinsic | Signature | Effect |
//! |-----------|-----------|--------|
//! | `WriteLine` | `void (str)` | Appends the line to the staging output |
//! | `i8_str` .. `u64_str`, `bool_str` | `str (T)` | Decimal / `true` / `false` text |
//! | `str_len` | `i32 (str)` | Length in bytes |
//! | `StrConcat` | `str (str, str)` | Concatenation |
//! | `Time_Now` | `str ()` | Seconds since the Unix epoch |
//! | `Assert` | `void (bool)` | Latches a failure on `false` |
//! | `Build_AddBody` | `void (str)` | Injects statements before the call site |
//! | `Build_Func` | `Func (str, str, str, str)` | Declares a new function |
//! | `Invoke` | `void (Func)` | Inserts a runtime call before the call site |
//! | `Func_Name` | `str (Func)` | Name of the function |
//! | `File_Open` | `File (str)` | Reads a text file |
//! | `File_HasLine` | `bool (File)` | Unread lines remain |
//! | `File_ReadLine` | `str (File)` | Next line |
//! | `str_md5` | `u8[] (str)` | MD5 digest |
//! | `bytes_hexstr` | `str (u8[])` | Upper-case hex |
//! | `WriteInts` | `void (i32[])` | Appends the comma-joined values as a line |

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use md5::{Digest, Md5};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    compiler::EventKind,
    ir::Tac,
    staging::{fault, StagingHost},
    symbols::{
        FunctionKind, FunctionSymbol, HandleType, LiteralValue, ParamDirection, ParamSymbol,
        TypeCode, TypeSymbol,
    },
    Result,
};

/// A builtin function implemented by the staging host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Intrinsic {
    /// `void WriteLine(str s)`
    #[strum(serialize = "WriteLine")]
    WriteLine,
    /// `str i8_str(i8 b)`
    #[strum(serialize = "i8_str")]
    I8Str,
    /// `str i16_str(i16 b)`
    #[strum(serialize = "i16_str")]
    I16Str,
    /// `str i32_str(i32 b)`
    #[strum(serialize = "i32_str")]
    I32Str,
    /// `str i64_str(i64 b)`
    #[strum(serialize = "i64_str")]
    I64Str,
    /// `str u8_str(u8 b)`
    #[strum(serialize = "u8_str")]
    U8Str,
    /// `str u16_str(u16 b)`
    #[strum(serialize = "u16_str")]
    U16Str,
    /// `str u32_str(u32 b)`
    #[strum(serialize = "u32_str")]
    U32Str,
    /// `str u64_str(u64 b)`
    #[strum(serialize = "u64_str")]
    U64Str,
    /// `str bool_str(bool b)`
    #[strum(serialize = "bool_str")]
    BoolStr,
    /// `i32 str_len(str s)`
    #[strum(serialize = "str_len")]
    StrLen,
    /// `str StrConcat(str s1, str s2)`
    #[strum(serialize = "StrConcat")]
    StrConcat,
    /// `str Time_Now()`
    #[strum(serialize = "Time_Now")]
    TimeNow,
    /// `void Assert(bool condition)`
    #[strum(serialize = "Assert")]
    Assert,
    /// `void Build_AddBody(str body)`
    #[strum(serialize = "Build_AddBody")]
    BuildAddBody,
    /// `Func Build_Func(str name, str returnType, str params, str body)`
    #[strum(serialize = "Build_Func")]
    BuildFunc,
    /// `void Invoke(Func f)`
    #[strum(serialize = "Invoke")]
    Invoke,
    /// `str Func_Name(Func f)`
    #[strum(serialize = "Func_Name")]
    FuncName,
    /// `File File_Open(str filename)`
    #[strum(serialize = "File_Open")]
    FileOpen,
    /// `bool File_HasLine(File file)`
    #[strum(serialize = "File_HasLine")]
    FileHasLine,
    /// `str File_ReadLine(File file)`
    #[strum(serialize = "File_ReadLine")]
    FileReadLine,
    /// `u8[] str_md5(str s)`
    #[strum(serialize = "str_md5")]
    StrMd5,
    /// `str bytes_hexstr(u8[] input)`
    #[strum(serialize = "bytes_hexstr")]
    BytesHexstr,
    /// `void WriteInts(i32[] ints)`
    #[strum(serialize = "WriteInts")]
    WriteInts,
}

fn primitive(code: TypeCode) -> TypeSymbol {
    TypeSymbol::Primitive(code)
}

impl Intrinsic {
    /// Returns the name calls bind to.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns `true` for intrinsics that only make sense while compiling.
    #[must_use]
    pub fn is_build(self) -> bool {
        matches!(
            self,
            Intrinsic::BuildAddBody
                | Intrinsic::BuildFunc
                | Intrinsic::Invoke
                | Intrinsic::FileOpen
                | Intrinsic::FileHasLine
                | Intrinsic::FileReadLine
        )
    }

    /// Returns the return type and the `(name, type)` parameter list.
    #[must_use]
    pub fn signature(self) -> (TypeSymbol, Vec<(&'static str, TypeSymbol)>) {
        let func = TypeSymbol::Handle(HandleType::Func);
        let file = TypeSymbol::Handle(HandleType::File);
        match self {
            Intrinsic::WriteLine => (TypeSymbol::VOID, vec![("s", TypeSymbol::STR)]),
            Intrinsic::I8Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::I8))]),
            Intrinsic::I16Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::I16))]),
            Intrinsic::I32Str => (TypeSymbol::STR, vec![("b", TypeSymbol::I32)]),
            Intrinsic::I64Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::I64))]),
            Intrinsic::U8Str => (TypeSymbol::STR, vec![("b", TypeSymbol::U8)]),
            Intrinsic::U16Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::U16))]),
            Intrinsic::U32Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::U32))]),
            Intrinsic::U64Str => (TypeSymbol::STR, vec![("b", primitive(TypeCode::U64))]),
            Intrinsic::BoolStr => (TypeSymbol::STR, vec![("b", TypeSymbol::BOOL)]),
            Intrinsic::StrLen => (TypeSymbol::I32, vec![("s", TypeSymbol::STR)]),
            Intrinsic::StrConcat => (
                TypeSymbol::STR,
                vec![("s1", TypeSymbol::STR), ("s2", TypeSymbol::STR)],
            ),
            Intrinsic::TimeNow => (TypeSymbol::STR, vec![]),
            Intrinsic::Assert => (TypeSymbol::VOID, vec![("condition", TypeSymbol::BOOL)]),
            Intrinsic::BuildAddBody => (TypeSymbol::VOID, vec![("body", TypeSymbol::STR)]),
            Intrinsic::BuildFunc => (
                func,
                vec![
                    ("name", TypeSymbol::STR),
                    ("returnType", TypeSymbol::STR),
                    ("params", TypeSymbol::STR),
                    ("body", TypeSymbol::STR),
                ],
            ),
            Intrinsic::Invoke => (TypeSymbol::VOID, vec![("f", func)]),
            Intrinsic::FuncName => (TypeSymbol::STR, vec![("f", func)]),
            Intrinsic::FileOpen => (file, vec![("filename", TypeSymbol::STR)]),
            Intrinsic::FileHasLine => (TypeSymbol::BOOL, vec![("file", file)]),
            Intrinsic::FileReadLine => (TypeSymbol::STR, vec![("file", file)]),
            Intrinsic::StrMd5 => (
                TypeSymbol::array_of(TypeSymbol::U8),
                vec![("s", TypeSymbol::STR)],
            ),
            Intrinsic::BytesHexstr => (
                TypeSymbol::STR,
                vec![("input", TypeSymbol::array_of(TypeSymbol::U8))],
            ),
            Intrinsic::WriteInts => (
                TypeSymbol::VOID,
                vec![("ints", TypeSymbol::array_of(TypeSymbol::I32))],
            ),
        }
    }

    /// Builds the builtin function symbol declared for this intrinsic.
    #[must_use]
    pub fn symbol(self) -> FunctionSymbol {
        let (return_type, parameters) = self.signature();
        FunctionSymbol {
            name: self.name().to_string(),
            return_type,
            parameters: parameters
                .into_iter()
                .map(|(name, ty)| Arc::new(ParamSymbol::new(name, ty, ParamDirection::In)))
                .collect(),
            is_build: self.is_build(),
            kind: FunctionKind::Builtin,
        }
    }

    /// Runs the intrinsic.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StagingFault`] for arguments of the wrong shape or
    /// count, a missing call site for the intrinsics that edit the program, and the
    /// errors of the front end and the file system.
    pub fn invoke(
        self,
        arguments: &[LiteralValue],
        host: &mut StagingHost<'_>,
    ) -> Result<Option<LiteralValue>> {
        let (_, parameters) = self.signature();
        if arguments.len() != parameters.len() {
            return Err(fault(
                self.name(),
                format!(
                    "expected {} arguments, got {}",
                    parameters.len(),
                    arguments.len()
                ),
            ));
        }

        let value = match self {
            Intrinsic::WriteLine => {
                let text = self.str_arg(arguments, 0)?;
                host.context.write_line(text);
                None
            }
            Intrinsic::I8Str
            | Intrinsic::I16Str
            | Intrinsic::I32Str
            | Intrinsic::I64Str
            | Intrinsic::U8Str
            | Intrinsic::U16Str
            | Intrinsic::U32Str
            | Intrinsic::U64Str
            | Intrinsic::BoolStr => {
                let expected = parameters[0].1.code();
                if arguments[0].type_code() != expected {
                    return Err(self.bad_argument(0, &arguments[0]));
                }
                Some(LiteralValue::Str(arguments[0].to_string()))
            }
            Intrinsic::StrLen => {
                let text = self.str_arg(arguments, 0)?;
                let len = i32::try_from(text.len())
                    .map_err(|_| fault(self.name(), "string too long"))?;
                Some(LiteralValue::I32(len))
            }
            Intrinsic::StrConcat => {
                let a = self.str_arg(arguments, 0)?;
                let b = self.str_arg(arguments, 1)?;
                Some(LiteralValue::Str(format!("{a}{b}")))
            }
            Intrinsic::TimeNow => {
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                Some(LiteralValue::Str(seconds.to_string()))
            }
            Intrinsic::Assert => {
                let condition = arguments[0]
                    .as_bool()
                    .ok_or_else(|| self.bad_argument(0, &arguments[0]))?;
                host.context.assert(condition);
                None
            }
            Intrinsic::BuildAddBody => {
                let body = self.str_arg(arguments, 0)?;
                Self::add_body(body.trim(), host)?;
                None
            }
            Intrinsic::BuildFunc => {
                let name = self.str_arg(arguments, 0)?;
                let return_type = self.str_arg(arguments, 1)?;
                let params = self.str_arg(arguments, 2)?;
                let body = self.str_arg(arguments, 3)?;
                let source = format!("{return_type} {name}({params})\n{{\n\t{body}\n}}");

                let symbol =
                    host.frontend
                        .lower_function(&source, host.program, host.diagnostics)?;
                host.events
                    .record(EventKind::FunctionCreated)
                    .function(symbol.name.clone())
                    .message(symbol.to_string());
                Some(LiteralValue::Func(symbol.name.clone()))
            }
            Intrinsic::Invoke => {
                let name = self.func_arg(arguments, 0)?;
                Self::invoke_later(name, host)?;
                None
            }
            Intrinsic::FuncName => {
                let name = self.func_arg(arguments, 0)?;
                Some(LiteralValue::Str(name.to_string()))
            }
            Intrinsic::FileOpen => {
                let path = self.str_arg(arguments, 0)?;
                Some(host.context.open_file(path)?)
            }
            Intrinsic::FileHasLine => {
                let file = host.context.file_mut(&arguments[0])?;
                Some(LiteralValue::Bool(file.has_line()))
            }
            Intrinsic::FileReadLine => {
                let file = host.context.file_mut(&arguments[0])?;
                let line = file
                    .read_line()
                    .ok_or_else(|| fault(self.name(), "read past the end of the file"))?;
                Some(LiteralValue::Str(line))
            }
            Intrinsic::StrMd5 => {
                let text = self.str_arg(arguments, 0)?;
                let mut hasher = Md5::new();
                Digest::update(&mut hasher, text.as_bytes());
                let digest = hasher
                    .finalize()
                    .iter()
                    .map(|b| LiteralValue::U8(*b))
                    .collect();
                Some(LiteralValue::Array(digest))
            }
            Intrinsic::BytesHexstr => {
                let LiteralValue::Array(items) = &arguments[0] else {
                    return Err(self.bad_argument(0, &arguments[0]));
                };
                let mut hex = String::with_capacity(items.len() * 2);
                for item in items {
                    let LiteralValue::U8(byte) = item else {
                        return Err(self.bad_argument(0, &arguments[0]));
                    };
                    hex.push_str(&format!("{byte:02X}"));
                }
                Some(LiteralValue::Str(hex))
            }
            Intrinsic::WriteInts => {
                let LiteralValue::Array(items) = &arguments[0] else {
                    return Err(self.bad_argument(0, &arguments[0]));
                };
                let line = items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                host.context.write_line(&line);
                None
            }
        };

        Ok(value)
    }

    /// Lowers `body` into the calling function, just before the call site.
    fn add_body(body: &str, host: &mut StagingHost<'_>) -> Result<()> {
        let site = host
            .context
            .call_site
            .clone()
            .ok_or_else(|| fault("Build_AddBody", "no call site"))?;

        let tacs = host.frontend.lower_statements(
            body,
            &site.function,
            host.program,
            host.diagnostics,
        )?;

        let function = host
            .program
            .function_mut(&site.function)
            .ok_or_else(|| fault("Build_AddBody", format!("unknown function {}", site.function)))?;
        let mut injected = 0;
        for tac in tacs {
            if matches!(tac, Tac::Data(_) | Tac::Nop) {
                continue;
            }
            function.tacs.insert_before(site.instruction, tac)?;
            injected += 1;
        }

        host.events
            .record(EventKind::SourceInjected)
            .function(site.function)
            .message(format!("{injected} instructions from `{body}`"));
        Ok(())
    }

    /// Inserts a runtime call to `name` just before the call site.
    fn invoke_later(name: &str, host: &mut StagingHost<'_>) -> Result<()> {
        let site = host
            .context
            .call_site
            .clone()
            .ok_or_else(|| fault("Invoke", "no call site"))?;
        let target = host
            .program
            .find_function(name)
            .ok_or_else(|| fault("Invoke", format!("unknown function {name}")))?;
        if !target.return_type.is_void() || !target.parameters.is_empty() {
            return Err(fault(
                "Invoke",
                format!("{target} must be void and take no parameters"),
            ));
        }

        let function = host
            .program
            .function_mut(&site.function)
            .ok_or_else(|| fault("Invoke", format!("unknown function {}", site.function)))?;
        function.tacs.insert_before(
            site.instruction,
            Tac::Call {
                result: None,
                function: target,
                arguments: Vec::new(),
                is_build: false,
            },
        )?;
        Ok(())
    }

    fn str_arg(self, arguments: &[LiteralValue], index: usize) -> Result<&str> {
        arguments[index]
            .as_str()
            .ok_or_else(|| self.bad_argument(index, &arguments[index]))
    }

    fn func_arg(self, arguments: &[LiteralValue], index: usize) -> Result<&str> {
        match &arguments[index] {
            LiteralValue::Func(name) => Ok(name),
            other => Err(self.bad_argument(index, other)),
        }
    }

    fn bad_argument(self, index: usize, value: &LiteralValue) -> crate::Error {
        fault(
            self.name(),
            format!("argument {index} has unexpected value {value}"),
        )
    }
}
