use std::process::ExitCode;

fn main() -> ExitCode {
    gif_player::command::args_handle()
}
