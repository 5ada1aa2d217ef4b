//! Seeded simulation of replicas typing over a reordering, duplicating bus.

use std::fmt;
use std::time::{Duration, Instant};

use quill_proto::ReplicaId;
use quill_sync::{EditingSurface, MemoryBus, RopeSurface, SyncConfig, SyncManager, SyncStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};


/// Document every replica edits.
pub const PATH: &str = "index.html";

/// Virtual time advanced per simulation step.
const TICK: Duration = Duration::from_millis(10);

/// Upper bound on settle rounds once typing stops.
const MAX_SETTLE_ROUNDS: usize = 100_000;

/// Knobs for one simulation run.
#[derive(Debug, Clone)]
pub struct Params {
	pub replicas: usize,
	pub steps: usize,
	pub seed: u64,
	pub edit_rate: f64,
	pub duplicate_rate: f64,
	pub initial: String,
	pub config: SyncConfig,
}

/// Outcome of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
	pub edits: usize,
	pub delivered: usize,
	pub duplicated: usize,
	pub resyncs: usize,
	pub errors: usize,
	pub settle_rounds: usize,
	/// Final text per replica, in replica order.
	pub texts: Vec<(ReplicaId, String)>,
	pub stalled: Vec<ReplicaId>,
}

impl Report {
	/// Returns true if every replica ended with the same text.
	pub fn converged(&self) -> bool {
		self.texts.windows(2).all(|pair| pair[0].1 == pair[1].1)
	}
}

impl fmt::Display for Report {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(
			f,
			"edits={} delivered={} duplicated={} resyncs={} errors={} settle_rounds={}",
			self.edits, self.delivered, self.duplicated, self.resyncs, self.errors, self.settle_rounds
		)?;
		for (id, text) in &self.texts {
			writeln!(f, "  {id}: {} chars", text.chars().count())?;
		}
		if self.converged() {
			write!(f, "converged")
		} else {
			write!(f, "DIVERGED")
		}
	}
}

struct Replica {
	id: ReplicaId,
	manager: SyncManager<RopeSurface>,
}

/// A running simulation.
pub struct Simulation {
	params: Params,
	rng: StdRng,
	bus: MemoryBus,
	replicas: Vec<Replica>,
	now: Instant,
	report: Report,
}

impl Simulation {
	/// Creates the replicas and opens the shared document on each.
	///
	/// Peer ids are drawn from the seeded RNG, so a seed replays the whole run.
	pub fn new(params: Params) -> anyhow::Result<Self> {
		let mut rng = StdRng::seed_from_u64(params.seed);
		let mut bus = MemoryBus::new();
		let mut replicas = Vec::with_capacity(params.replicas);
		for idx in 0..params.replicas {
			let id = if idx == 0 {
				ReplicaId::master()
			} else {
				ReplicaId::from_random_bytes(rng.r#gen())
			};
			bus.subscribe(id.clone());
			let mut manager = SyncManager::new(id.clone(), None, params.config.clone());
			manager.open(PATH, RopeSurface::new(&params.initial))?;
			replicas.push(Replica { id, manager });
		}

		Ok(Self {
			rng,
			params,
			bus,
			replicas,
			now: Instant::now(),
			report: Report::default(),
		})
	}

	/// Runs every step, then delivers everything in flight.
	pub fn run(mut self) -> Report {
		for step in 0..self.params.steps {
			if self.rng.gen_bool(self.params.edit_rate) {
				self.random_edit();
			} else if self.rng.gen_bool(0.2) {
				self.random_cursor();
			} else {
				self.random_delivery();
			}
			self.tick();
			if step % 100 == 0 {
				debug!(step, in_flight = self.bus.in_flight(), "simulation progress");
			}
		}
		self.settle();
		self.finish()
	}

	fn tick(&mut self) {
		self.now += TICK;
		for replica in &mut self.replicas {
			replica.manager.poll(self.now, &mut self.bus);
		}
	}

	fn random_edit(&mut self) {
		let idx = self.rng.gen_range(0..self.replicas.len());
		let replica = &mut self.replicas[idx];
		let Some(doc) = replica.manager.document_mut(PATH) else {
			return;
		};

		let len = doc.surface.rope().len_chars();
		let pos = self.rng.gen_range(0..=len);
		let removed = if len > pos && self.rng.gen_bool(0.3) {
			self.rng.gen_range(1..=(len - pos).min(4))
		} else {
			0
		};
		let inserted: String = (0..self.rng.gen_range(0..4))
			.map(|_| char::from(self.rng.gen_range(b'a'..=b'z')))
			.collect();

		let delta = doc.surface.edit(pos, removed, &inserted);
		match doc.local_edit(&delta, &mut self.bus, self.now) {
			Ok(_) => self.report.edits += 1,
			Err(err) => {
				warn!(replica = %replica.id, error = %err, "local edit rejected");
				self.report.errors += 1;
			}
		}
	}

	fn random_cursor(&mut self) {
		let idx = self.rng.gen_range(0..self.replicas.len());
		let Some(doc) = self.replicas[idx].manager.document_mut(PATH) else {
			return;
		};
		let len = doc.surface.rope().len_chars();
		let start = self.rng.gen_range(0..=len);
		let end = self.rng.gen_range(start..=len);
		doc.binding.local_cursor(start, end, &mut self.bus, self.now);
	}

	fn random_delivery(&mut self) {
		let ready = self.bus.ready();
		if ready.is_empty() {
			return;
		}
		let (receiver, sender) = ready[self.rng.gen_range(0..ready.len())].clone();
		let duplicate = self.rng.gen_bool(self.params.duplicate_rate);
		self.deliver(&receiver, &sender, duplicate);
	}

	fn deliver(&mut self, receiver: &ReplicaId, sender: &ReplicaId, duplicate: bool) {
		let Some(msg) = self.bus.deliver(receiver, sender) else {
			return;
		};
		let Some(replica) = self.replicas.iter_mut().find(|r| r.id == *receiver) else {
			return;
		};

		let copies = if duplicate { 2 } else { 1 };
		for _ in 0..copies {
			if let Err(err) = replica.manager.handle_message(&msg, &mut self.bus, self.now) {
				warn!(replica = %replica.id, error = %err, "inbound message rejected");
				self.report.errors += 1;
			}
		}
		self.report.delivered += 1;
		self.report.duplicated += copies - 1;
	}

	/// Delivers until the bus is empty and no document has pending edits.
	fn settle(&mut self) {
		for round in 0..MAX_SETTLE_ROUNDS {
			let ready = self.bus.ready();
			let pending = self.replicas.iter().any(|r| r.manager.has_pending());
			if ready.is_empty() && !pending {
				self.report.settle_rounds = round;
				return;
			}
			for (receiver, sender) in ready {
				self.deliver(&receiver, &sender, false);
			}
			self.tick();
		}
		self.report.settle_rounds = MAX_SETTLE_ROUNDS;
		warn!(in_flight = self.bus.in_flight(), "simulation did not settle");
	}

	fn finish(mut self) -> Report {
		for replica in &self.replicas {
			let Some(doc) = replica.manager.document(PATH) else {
				continue;
			};
			if !doc.is_consistent() {
				warn!(replica = %replica.id, "surface differs from mirror");
			}
			if replica.manager.status(PATH) == Some(SyncStatus::Stalled) {
				self.report.stalled.push(replica.id.clone());
			}
			self.report.resyncs += doc.surface.replacements();
			self.report
				.texts
				.push((replica.id.clone(), doc.surface.contents()));
		}
		self.report
	}
}
