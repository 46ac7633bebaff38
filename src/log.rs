use std::fmt::Display;

pub fn error(msg: impl Display) {
    eprintln!("[ Error ] {}", msg);
}

pub fn warn(msg: impl Display) {
    eprintln!("[ Warn  ] {}", msg);
}

pub fn info(msg: impl Display) {
    eprintln!("[ Info  ] {}", msg);
}
