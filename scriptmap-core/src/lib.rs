pub mod crawl;
pub mod data;
pub mod report;

pub fn print_banner() {
    println!(
        r#"
  ___  ___ _ __(_)_ __ | |_ _ __ ___   __ _ _ __
 / __|/ __| '__| | '_ \| __| '_ ` _ \ / _` | '_ \
 \__ \ (__| |  | | |_) | |_| | | | | | (_| | |_) |
 |___/\___|_|  |_| .__/ \__|_| |_| |_|\__,_| .__/
                 |_|                       |_|      v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
