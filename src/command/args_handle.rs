use crate::playback::Image;
use crate::{PlaybackStatus, Result, Status, REFRESH_RATE};
use clap::Parser;
use colored::Colorize;
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    thread,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(help = "要打开的图片路径，支持 gif 和 png")]
    path: PathBuf,

    #[arg(short = 'f', long, help = "展示多少帧后退出，默认播放一轮")]
    frames: Option<usize>,

    #[arg(
        short = 'r',
        long,
        default_value_t = REFRESH_RATE,
        help = "渲染循环每秒检查几次新帧，默认 60"
    )]
    refresh_rate: u32,

    #[arg(
        short = 'e',
        long,
        help = "把每一帧保存为 png 的文件夹，文件名 frame_0000.png"
    )]
    export: Option<PathBuf>,

    #[arg(short = 'p', long, help = "打开后先暂停")]
    paused: bool,

    #[arg(short = 'd', long, help = "只打印图片信息")]
    details: bool,

    #[arg(short = 'v', long, help = "输出调试日志，也可以用 RUST_LOG 控制")]
    verbose: bool,
}

/// 处理命令行参数
pub fn args_handle() -> ExitCode {
    // 获取命令行参数
    let args = Args::parse();
    init_tracing(args.verbose);

    match present(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// 模拟宿主渲染循环：每个 tick 检查一次 ready，有新帧就取走
fn present(args: &Args) -> Result<()> {
    let image = Image::open(&args.path)?;
    let details = image.describe();

    if args.details {
        println!("{}", details.to_string().green());
        if let Image::Animated(animated) = &image {
            for (i, frame) in animated.store().frames().iter().enumerate() {
                let delay = frame
                    .delay()
                    .map_or("-".to_string(), |d| format!("{}ms", u32::from(d) * 10));
                let transparent = frame
                    .transparent()
                    .map_or("-".to_string(), |t| t.to_string());
                println!(
                    "  #{i}: {}x{}+{}+{} delay {delay} transparent {transparent} {:?}",
                    frame.width,
                    frame.height,
                    frame.left,
                    frame.top,
                    frame.disposal(),
                );
            }
        }
        image.close();
        return Ok(());
    }

    if args.paused {
        image.set_status(Status::Pause);
    }
    if let Some(dir) = &args.export {
        fs::create_dir_all(dir)?;
    }

    let target = args.frames.unwrap_or(details.frame_count).max(1);
    let tick = Duration::from_secs(1) / args.refresh_rate.max(1);
    let start_time = Instant::now();
    let mut presented = 0;

    while presented < target {
        let before = Instant::now();

        if image.poll_ready() {
            let texture = image.consume();
            if let Some(dir) = &args.export {
                texture.write_png(&dir.join(format!("frame_{presented:04}.png")))?;
            }
            presented += 1;
            update_progress_bar(presented, target);
        } else if image.status() != PlaybackStatus::Playing {
            // 静态或暂停，不会再有新帧
            break;
        }

        // 扣掉本轮耗时，保持刷新率
        thread::sleep(tick.saturating_sub(before.elapsed()));
    }

    image.close();

    println!();
    println!("Total time: {}s", start_time.elapsed().as_secs_f64());
    println!("{}", format!("Presented {presented} frames").green());
    Ok(())
}

/// 更新进度条
fn update_progress_bar(current: usize, total: usize) {
    let perc = current as f64 / total as f64;
    let lpad = (perc * 20.0).floor() as usize;

    print!(
        "\rPresenting frames: {}{} {}%",
        "\u{25A0}".repeat(lpad),
        "-".repeat(20 - lpad.min(20)),
        (perc * 100.0).trunc()
    );
    io::stdout().flush().ok();
}
