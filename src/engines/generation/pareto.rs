/// NSGA-II building blocks: dominance, fast non-dominated sorting, crowding
/// distance and survivor selection over fronts.

/// Whether an objective is better when larger or smaller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// Payload with its objective values and NSGA-II bookkeeping
#[derive(Debug, Clone)]
pub struct MultiObjectiveIndividual<T> {
    pub data: T,
    pub objectives: Vec<f64>,
    pub rank: usize,            // 0 = first front
    pub crowding_distance: f64, // larger = more isolated
}

impl<T> MultiObjectiveIndividual<T> {
    pub fn new(data: T, objectives: Vec<f64>) -> Self {
        Self {
            data,
            objectives,
            rank: 0,
            crowding_distance: 0.0,
        }
    }
}

/// True when `a` is no worse than `b` everywhere and strictly better somewhere
pub fn dominates(a_objectives: &[f64], b_objectives: &[f64], directions: &[OptimizationDirection]) -> bool {
    if a_objectives.len() != b_objectives.len() || a_objectives.len() != directions.len() {
        return false;
    }

    let mut at_least_one_better = false;

    for ((&a_val, &b_val), direction) in a_objectives.iter().zip(b_objectives).zip(directions) {
        let (a_better, b_better) = match direction {
            OptimizationDirection::Maximize => (a_val > b_val, b_val > a_val),
            OptimizationDirection::Minimize => (a_val < b_val, b_val < a_val),
        };

        if b_better {
            return false;
        }
        if a_better {
            at_least_one_better = true;
        }
    }

    at_least_one_better
}

/// Group individuals into fronts (0 = non-dominated) and record each one's rank
pub fn fast_non_dominated_sort<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<Vec<usize>> {
    let n = individuals.len();
    if n == 0 {
        return Vec::new();
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&individuals[i].objectives, &individuals[j].objectives, directions) {
                dominated_solutions[i].push(j);
            } else if dominates(&individuals[j].objectives, &individuals[i].objectives, directions) {
                domination_count[i] += 1;
            }
        }

        if domination_count[i] == 0 {
            individuals[i].rank = 0;
            first_front.push(i);
        }
    }

    let mut fronts = vec![first_front];
    let mut front_index = 0;
    while front_index < fronts.len() {
        let mut next_front = Vec::new();

        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    individuals[j].rank = front_index + 1;
                    next_front.push(j);
                }
            }
        }

        if next_front.is_empty() {
            break;
        }
        fronts.push(next_front);
        front_index += 1;
    }

    fronts
}

/// Crowding distance of every member of one front
pub fn calculate_crowding_distance<T>(individuals: &mut [MultiObjectiveIndividual<T>], front_indices: &[usize]) {
    let front_size = front_indices.len();

    if front_size <= 2 {
        for &idx in front_indices {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    for &idx in front_indices {
        individuals[idx].crowding_distance = 0.0;
    }

    let num_objectives = individuals[front_indices[0]].objectives.len();
    for obj in 0..num_objectives {
        let mut sorted: Vec<usize> = front_indices.to_vec();
        sorted.sort_by(|&a, &b| {
            individuals[a].objectives[obj]
                .partial_cmp(&individuals[b].objectives[obj])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let first = sorted[0];
        let last = sorted[front_size - 1];
        individuals[first].crowding_distance = f64::INFINITY;
        individuals[last].crowding_distance = f64::INFINITY;

        let range = individuals[last].objectives[obj] - individuals[first].objectives[obj];
        if range.abs() < 1e-10 {
            continue;
        }

        for window in sorted.windows(3) {
            let gap = individuals[window[2]].objectives[obj] - individuals[window[0]].objectives[obj];
            individuals[window[1]].crowding_distance += gap / range;
        }
    }
}

/// Crowded comparison: lower rank wins, then larger crowding distance
pub fn crowded_comparison<T>(a: &MultiObjectiveIndividual<T>, b: &MultiObjectiveIndividual<T>) -> bool {
    if a.rank != b.rank {
        return a.rank < b.rank;
    }
    a.crowding_distance > b.crowding_distance
}

/// Sort, compute crowding for every front, and return the fronts
pub fn rank_population<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<Vec<usize>> {
    let fronts = fast_non_dominated_sort(individuals, directions);
    for front in &fronts {
        calculate_crowding_distance(individuals, front);
    }
    fronts
}

/// Indices of the `capacity` survivors: whole fronts first, the last front cut by crowding
pub fn select_survivors<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
    capacity: usize,
) -> Vec<usize> {
    let fronts = rank_population(individuals, directions);
    let mut survivors = Vec::with_capacity(capacity);

    for front in fronts {
        if survivors.len() + front.len() <= capacity {
            survivors.extend(front);
            continue;
        }
        let mut last = front;
        last.sort_by(|&a, &b| {
            individuals[b]
                .crowding_distance
                .partial_cmp(&individuals[a].crowding_distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let room = capacity - survivors.len();
        survivors.extend(last.into_iter().take(room));
        break;
    }

    survivors
}
