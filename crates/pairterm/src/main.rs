mod app;
mod chat;
mod config;
mod events;
mod history;
mod keymap;
mod logging;
mod terminal;
mod tools;

#[cfg(test)]
mod test_utils;

fn main() -> std::io::Result<()> {
    app::run()
}
