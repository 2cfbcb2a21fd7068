// tether-demo: a worker thread reports progress and asks a question, while
// the console is only ever touched from the main thread's message loop.

use std::cell::RefCell;
use std::io;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tether_rt::{BoxError, DispatchError, Dispatcher, MessageQueue};
use tether_tui::{prompt_bool, ConsoleError, CrosstermTerminal, ProgressBar, Terminal};

const STEPS: u32 = 40;
const STEP_DELAY: Duration = Duration::from_millis(50);

/// Console state owned by the main thread.
struct Console {
    terminal: CrosstermTerminal,
    bar: ProgressBar,
}

thread_local! {
    static CONSOLE: RefCell<Option<Console>> = const { RefCell::new(None) };
}

/// Run `f` against the console. Only succeeds on the thread that installed
/// it, which is the message loop's owner.
fn with_console<T>(f: impl FnOnce(&mut Console) -> Result<T, ConsoleError>) -> Result<T, BoxError> {
    CONSOLE.with(|slot| {
        let mut slot = slot.borrow_mut();
        let console = slot
            .as_mut()
            .ok_or("console is only reachable from the main thread")?;
        Ok(f(console)?)
    })
}

fn init_tracing() {
    // Logs go to stderr so they never land in the middle of the bar.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tether-demo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), BoxError> {
    let queue = Arc::new(MessageQueue::new());

    let mut terminal = CrosstermTerminal::new();
    let bar = ProgressBar::new(&mut terminal, "Indexing: ")?;
    CONSOLE.with(|slot| *slot.borrow_mut() = Some(Console { terminal, bar }));

    let worker = {
        let dispatcher = queue.dispatcher();
        thread::spawn(move || work(dispatcher))
    };

    queue.run_loop()?;
    let keep = worker.join().map_err(|_| "worker thread panicked")??;
    tracing::debug!(keep, "worker finished");

    with_console(|console| {
        let verdict = if keep { "Index kept." } else { "Index discarded." };
        console.terminal.write(verdict)?;
        console.terminal.write("\r\n")?;
        console.terminal.flush()?;
        Ok(())
    })
}

/// Worker thread body. Closes the queue on the way out so the main thread's
/// loop can finish, whether or not the work succeeded.
fn work(dispatcher: Dispatcher) -> Result<bool, DispatchError> {
    let result = report(&dispatcher);
    dispatcher.queue().close();
    result
}

fn report(dispatcher: &Dispatcher) -> Result<bool, DispatchError> {
    for step in 0..=STEPS {
        thread::sleep(STEP_DELAY);
        let ratio = f64::from(step) / f64::from(STEPS);
        dispatcher.post(
            |ratio: f64| with_console(|console| console.bar.draw(&mut console.terminal, ratio)),
            ratio,
        )?;
    }
    tracing::info!(steps = STEPS, "work finished");

    // The prompt has to run where the console lives; block until answered.
    let answer = Arc::new(AtomicBool::new(false));
    dispatcher.send(
        |answer: Arc<AtomicBool>| {
            let keep = with_console(|console| prompt_bool(&mut console.terminal, "Keep the index?", true))?;
            answer.store(keep, Ordering::SeqCst);
            Ok(())
        },
        answer.clone(),
    )?;

    Ok(answer.load(Ordering::SeqCst))
}
