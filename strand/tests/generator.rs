use strand::{Co, Generator, GeneratorState};

fn countdown(from: u32) -> impl FnOnce(Co<u32>) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()>>> {
    move |co| {
        Box::pin(async move {
            for n in (1..=from).rev() {
                co.yield_(n).await;
            }
        })
    }
}

#[test]
fn a_body_that_never_yields_completes_on_first_advance() {
    let mut gen = Generator::<u32>::new(|_co| async {});
    assert_eq!(gen.advance(), None);
    assert_eq!(gen.state(), GeneratorState::Complete);
    for _ in 0..3 {
        assert_eq!(gen.advance(), None);
    }
}

#[test]
fn single_pass_and_restart_from_factory() {
    let mut gen = Generator::new(countdown(3));
    assert_eq!(gen.advance(), Some(3));
    assert_eq!(gen.by_ref().collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(gen.advance(), None);

    let fresh: Vec<u32> = Generator::new(countdown(3)).collect();
    assert_eq!(fresh, vec![3, 2, 1]);
}

#[test]
fn values_are_produced_lazily() {
    let produced = std::cell::Cell::new(0);
    let mut gen = Generator::new(|co| {
        let produced = &produced;
        async move {
            loop {
                produced.set(produced.get() + 1);
                co.yield_(produced.get()).await;
            }
        }
    });
    assert_eq!(produced.get(), 0);
    assert_eq!(gen.advance(), Some(1));
    assert_eq!(gen.advance(), Some(2));
    assert_eq!(produced.get(), 2);
    assert_eq!(gen.state(), GeneratorState::Suspended);
}
